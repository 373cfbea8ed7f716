//! 推送记录 - 哪些项目在哪天推送过
//!
//! 只需要两个操作：
//! - `recently_pushed`：查询回看窗口内推送过的项目
//! - `record_push`：推送成功后写入记录，同一 (项目, 日期) 重复写入视为无操作

pub mod sqlite;

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

use crate::dedup::lookback_window;

pub use sqlite::SqlitePushLedger;

/// 推送记录存储
pub trait PushLedger {
    /// 窗口 `[reference - (days - 1), reference]` 内推送过的项目 ID
    fn recently_pushed(&self, lookback_days: u32, reference: NaiveDate) -> Result<HashSet<String>>;

    /// 记录推送（幂等）
    fn record_push(&self, ids: &[String], date: NaiveDate) -> Result<()>;
}

/// 内存实现（dry-run 和测试使用）
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<BTreeSet<(NaiveDate, String)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PushLedger for MemoryLedger {
    fn recently_pushed(&self, lookback_days: u32, reference: NaiveDate) -> Result<HashSet<String>> {
        let Some((start, end)) = lookback_window(reference, lookback_days) else {
            return Ok(HashSet::new());
        };
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory ledger lock poisoned"))?;
        Ok(entries
            .iter()
            .filter(|(date, _)| *date >= start && *date <= end)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn record_push(&self, ids: &[String], date: NaiveDate) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory ledger lock poisoned"))?;
        for id in ids {
            entries.insert((date, id.clone()));
        }
        Ok(())
    }
}
