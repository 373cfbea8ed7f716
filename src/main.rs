//! GitHub Trend Bot CLI
//!
//! 每日推送 AI 相关的 GitHub 趋势项目到企业微信群

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use github_trend_bot::{
    cli::{run_history, run_init_db, run_push, HistoryArgs, PushArgs},
    BotConfig, PushOutcome,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "trend-bot")]
#[command(about = "GitHub Trend Bot - 每日 AI 趋势项目推送")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/github-trend-bot/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 读取采集结果，去重后推送每日消息
    Push(PushArgs),
    /// 查看推送历史
    History(HistoryArgs),
    /// 创建推送记录数据库
    InitDb,
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug trend-bot push --input today.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("github_trend_bot=info,trend_bot=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = BotConfig::load(cli.config.as_deref())?;
    debug!(db = %config.storage.db_path.display(), "Config ready");

    match cli.command {
        Commands::Push(args) => {
            if let PushOutcome::Failed { .. } = run_push(&args, &config)? {
                bail!("Daily push failed");
            }
        }
        Commands::History(args) => {
            run_history(&args, &config)?;
        }
        Commands::InitDb => {
            run_init_db(&config)?;
        }
    }

    Ok(())
}
