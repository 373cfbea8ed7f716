//! `trend-bot init-db` 命令 - 创建推送记录数据库

use anyhow::Result;
use tracing::info;

use crate::config::BotConfig;
use crate::ledger::SqlitePushLedger;

/// 打开（必要时创建）数据库并建表，返回已有记录数
pub fn run_init_db(config: &BotConfig) -> Result<u64> {
    let path = &config.storage.db_path;
    let ledger = SqlitePushLedger::open(path)?;
    let count = ledger.count()?;
    info!(path = %path.display(), count, "Ledger db ready");
    println!("✅ 数据库已就绪: {}（{} 条推送记录）", path.display(), count);
    Ok(count)
}
