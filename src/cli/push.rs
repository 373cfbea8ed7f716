//! `trend-bot push` 命令 - 读取采集结果，去重、组装并推送每日消息

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use super::input::CollectorInput;
use super::output::{describe_outcome, render_messages};
use crate::config::BotConfig;
use crate::ledger::{MemoryLedger, PushLedger, SqlitePushLedger};
use crate::notification::archive::DailyArchive;
use crate::notification::composer::MessageComposer;
use crate::notification::delivery::{DeliveryClient, FixedDelay};
use crate::notification::webhook::{Transport, TransportError, TransportReply, WebhookClient};
use crate::pipeline::{DailyPush, PushOutcome, PushSettings, RunOptions};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// 采集结果 JSON 文件（`-` 表示标准输入）
    #[arg(long, short)]
    pub input: PathBuf,
    /// 推送日期（YYYY-MM-DD），默认取输入文件中的日期或今天
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// 打印消息但不发送（调试用）
    #[arg(long)]
    pub dry_run: bool,
    /// 跳过去重检查
    #[arg(long)]
    pub no_dedup: bool,
}

/// dry-run 时使用的传输层，任何发送都会失败
struct DisabledTransport;

impl Transport for DisabledTransport {
    fn name(&self) -> &str {
        "disabled"
    }

    fn post_markdown(&self, _content: &str) -> Result<TransportReply, TransportError> {
        Err(TransportError::Request("sending disabled in dry run".to_string()))
    }
}

/// 执行 push 命令主逻辑
pub fn run_push(args: &PushArgs, config: &BotConfig) -> Result<PushOutcome> {
    let input = CollectorInput::load(&args.input, &config.markers)?;
    let date = args
        .date
        .or(input.date)
        .unwrap_or_else(|| Local::now().date_naive());

    let composer = MessageComposer::new(config.markers.clone(), config.push.composer_limits())?;

    let transport: Box<dyn Transport> = if args.dry_run {
        Box::new(DisabledTransport)
    } else {
        Box::new(WebhookClient::new(config.webhook_config())?)
    };
    let delivery = DeliveryClient::new(transport)
        .with_pacer(Box::new(FixedDelay(config.push.inter_message_delay())))
        .with_retry_limit(config.push.retry_markdown_limit);

    // dry-run 不创建数据库文件
    let ledger: Box<dyn PushLedger> = if args.dry_run && !config.storage.db_path.exists() {
        warn!(path = %config.storage.db_path.display(), "Ledger db not found, dry run without history");
        Box::new(MemoryLedger::new())
    } else {
        Box::new(SqlitePushLedger::open(&config.storage.db_path)?)
    };

    let archive = DailyArchive::new(config.storage.archive_dir.clone());
    let settings = PushSettings {
        daily_limit: config.push.daily_limit,
        lookback_days: config.push.lookback_days,
        alert_on_failure: config.push.alert_on_failure,
    };
    let options = RunOptions {
        date,
        dry_run: args.dry_run,
        bypass_dedup: args.no_dedup,
    };

    let outcome = DailyPush::new(&composer, &delivery, ledger.as_ref(), settings)
        .with_archive(&archive)
        .run(input.daily, &input.summary, options)?;

    if let PushOutcome::DryRun { digest, summary } = &outcome {
        println!("{}\n", render_messages(digest, summary));
    }
    println!("{}", describe_outcome(&outcome));
    info!(delivered = outcome.is_delivered(), "Push command finished");

    Ok(outcome)
}
