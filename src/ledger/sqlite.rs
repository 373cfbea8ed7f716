//! SQLite 推送记录
//!
//! 表 `daily_push_records` 以 `UNIQUE(repo_name, pushed_date)` 约束保证幂等，
//! 日期以 `YYYY-MM-DD` 文本存储，字典序即日期序。

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::PushLedger;
use crate::dedup::lookback_window;
use crate::model::LedgerEntry;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS daily_push_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_name TEXT NOT NULL,
    pushed_date DATE NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(repo_name, pushed_date)
);

CREATE INDEX IF NOT EXISTS idx_push_records_date ON daily_push_records(pushed_date);
";

/// SQLite 推送记录
pub struct SqlitePushLedger {
    conn: Connection,
}

impl SqlitePushLedger {
    /// 打开或创建数据库文件并建表
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open ledger db {}", db_path.display()))?;
        let ledger = Self { conn };
        ledger.apply_pragmas()?;
        ledger.apply_schema()?;
        debug!(path = %db_path.display(), "Push ledger opened");
        Ok(ledger)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self> {
        let ledger = Self {
            conn: Connection::open_in_memory()?,
        };
        ledger.apply_schema()?;
        Ok(ledger)
    }

    fn apply_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// 窗口内的全部记录（按日期倒序）
    pub fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT repo_name, pushed_date FROM daily_push_records
             WHERE pushed_date >= ?1 AND pushed_date <= ?2
             ORDER BY pushed_date DESC, repo_name ASC",
        )?;
        let rows = stmt.query_map(
            params![
                start.format(DATE_FORMAT).to_string(),
                end.format(DATE_FORMAT).to_string()
            ],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, date) = row?;
            let pushed_date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("Invalid pushed_date in ledger: {}", date))?;
            entries.push(LedgerEntry { id, pushed_date });
        }
        Ok(entries)
    }

    /// 记录总数
    pub fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM daily_push_records", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl PushLedger for SqlitePushLedger {
    fn recently_pushed(&self, lookback_days: u32, reference: NaiveDate) -> Result<HashSet<String>> {
        let Some((start, end)) = lookback_window(reference, lookback_days) else {
            return Ok(HashSet::new());
        };

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT repo_name FROM daily_push_records
             WHERE pushed_date >= ?1 AND pushed_date <= ?2",
        )?;
        let ids = stmt
            .query_map(
                params![
                    start.format(DATE_FORMAT).to_string(),
                    end.format(DATE_FORMAT).to_string()
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<HashSet<String>>>()?;

        debug!(%start, %end, count = ids.len(), "Recently pushed items loaded");
        Ok(ids)
    }

    fn record_push(&self, ids: &[String], date: NaiveDate) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO daily_push_records (repo_name, pushed_date) VALUES (?1, ?2)",
            )?;
            let pushed_date = date.format(DATE_FORMAT).to_string();
            for id in ids {
                inserted += stmt.execute(params![id, pushed_date])?;
            }
        }
        tx.commit()?;

        info!(%date, requested = ids.len(), inserted, "Push records saved");
        Ok(())
    }
}
