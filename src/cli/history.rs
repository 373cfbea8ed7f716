//! `trend-bot history` 命令 - 查看回看窗口内的推送记录

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use clap::Args;

use super::output::{format_history, format_json};
use crate::config::BotConfig;
use crate::dedup::{lookback_window, MAX_LOOKBACK_DAYS};
use crate::ledger::SqlitePushLedger;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// 回看天数（含当天）
    #[arg(long, short, default_value = "7", value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOOKBACK_DAYS)))]
    pub days: u32,
    /// 窗口结束日期（YYYY-MM-DD），默认今天
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// JSON 格式输出
    #[arg(long)]
    pub json: bool,
}

/// 执行 history 命令
pub fn run_history(args: &HistoryArgs, config: &BotConfig) -> Result<()> {
    let reference = args.date.unwrap_or_else(|| Local::now().date_naive());
    let (start, end) = lookback_window(reference, args.days)
        .ok_or_else(|| anyhow!("--days must be at least 1"))?;

    if !config.storage.db_path.exists() {
        return Err(anyhow!(
            "Ledger db not found: {} (run `trend-bot init-db` first)",
            config.storage.db_path.display()
        ));
    }

    let ledger = SqlitePushLedger::open(&config.storage.db_path)?;
    let entries = ledger.entries_between(start, end)?;

    if args.json {
        println!("{}", format_json(&entries));
    } else {
        println!("📅 {} ~ {}", start, end);
        println!("{}", format_history(&entries));
    }
    Ok(())
}
