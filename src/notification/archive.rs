//! 推送内容本地归档 - 每天一个 markdown 文件

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// 日报归档目录
pub struct DailyArchive {
    dir: PathBuf,
}

impl DailyArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 指定日期的归档文件路径
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入（覆盖）当天的归档文档（带文件锁）
    pub fn write(&self, date: NaiveDate, document: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create archive dir {}", self.dir.display()))?;

        let path = self.path_for(date);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open archive file {}", path.display()))?;

        // 持锁后再清空，避免并发写入时读到半截文件
        file.lock_exclusive()?;
        file.set_len(0)?;
        file.write_all(document.as_bytes())?;
        if !document.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.unlock()?;

        info!(path = %path.display(), bytes = document.len(), "Daily archive written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_for_date() {
        let archive = DailyArchive::new("/tmp/reports");
        let path = archive.path_for(NaiveDate::from_ymd_opt(2026, 2, 9).unwrap());
        assert_eq!(path, PathBuf::from("/tmp/reports/2026-02-09.md"));
    }

    #[test]
    fn test_archive_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DailyArchive::new(dir.path().join("daily"));
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();

        archive.write(date, "first version").unwrap();
        let path = archive.write(date, "second").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second\n");
    }

    #[test]
    fn test_archive_write_waits_for_lock_before_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DailyArchive::new(dir.path().join("daily"));
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        let path = archive.write(date, "existing report").unwrap();

        // 另一个句柄持有锁期间，旧内容不能被清空
        let holder = fs::File::open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let writer = {
            let archive = DailyArchive::new(archive.dir().to_path_buf());
            std::thread::spawn(move || archive.write(date, "new report").unwrap())
        };
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing report\n");

        holder.unlock().unwrap();
        writer.join().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new report\n");
    }
}
