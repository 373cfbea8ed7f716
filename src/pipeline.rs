//! 每日推送编排 - 筛选、去重、组装、投递、记录
//!
//! 推送策略：
//! - 没有 AI 相关项目时不发送任何消息
//! - 相关性判断或总结生成降级（生成器失败）时不推送
//! - 两条消息都发送成功后才写入推送记录
//! - 推送失败时可选地发送一条运维告警

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::dedup::select;
use crate::ledger::PushLedger;
use crate::model::{Candidate, ComposedMessage, GenerationOutcome, MessageKind, PushBatch};
use crate::notification::archive::DailyArchive;
use crate::notification::budget::fit;
use crate::notification::composer::{msg, MessageComposer};
use crate::notification::delivery::{DeliveryClient, DeliveryError, SplitPushState};

/// 总结生成协作者
pub trait SummaryGenerator {
    /// 为入选项目生成总结；失败时返回 `degraded = true` 的结果
    fn generate(&self, selected: &[Candidate]) -> GenerationOutcome;
}

impl<F> SummaryGenerator for F
where
    F: Fn(&[Candidate]) -> GenerationOutcome,
{
    fn generate(&self, selected: &[Candidate]) -> GenerationOutcome {
        self(selected)
    }
}

/// 预先生成好的总结（来自采集器输入）
#[derive(Debug, Clone, Default)]
pub struct PresetSummary(pub GenerationOutcome);

impl SummaryGenerator for PresetSummary {
    fn generate(&self, _selected: &[Candidate]) -> GenerationOutcome {
        self.0.clone()
    }
}

/// 编排参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSettings {
    pub daily_limit: usize,
    pub lookback_days: u32,
    pub alert_on_failure: bool,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            daily_limit: crate::dedup::DEFAULT_DAILY_LIMIT,
            lookback_days: crate::dedup::DEFAULT_LOOKBACK_DAYS,
            alert_on_failure: true,
        }
    }
}

/// 单次运行选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub date: NaiveDate,
    /// 只组装打印，不发送、不记录
    pub dry_run: bool,
    /// 跳过去重查询
    pub bypass_dedup: bool,
}

impl RunOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            dry_run: false,
            bypass_dedup: false,
        }
    }
}

/// 上游采集结果
#[derive(Debug, Clone, Default)]
pub struct DailyInput {
    /// 按排名排序的候选项目（含相关性标注）
    pub candidates: Vec<Candidate>,
    /// 相关性判断是否降级
    pub filter_degraded: bool,
}

/// 一次推送的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// 没有 AI 相关项目
    NoCandidates,
    /// 候选项目都在回看窗口内推送过
    NothingNew,
    /// 生成器降级，放弃推送
    SkippedDegraded { filter: bool, summary: bool },
    /// dry-run：组装好的两条消息
    DryRun {
        digest: ComposedMessage,
        summary: ComposedMessage,
    },
    /// 推送成功并已记录
    Delivered {
        ids: Vec<String>,
        archive: Option<PathBuf>,
    },
    /// 推送失败（未记录）
    Failed {
        state: SplitPushState,
        error: Option<DeliveryError>,
    },
}

impl PushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PushOutcome::Delivered { .. })
    }
}

/// 每日推送编排器
pub struct DailyPush<'a> {
    composer: &'a MessageComposer,
    delivery: &'a DeliveryClient,
    ledger: &'a dyn PushLedger,
    archive: Option<&'a DailyArchive>,
    settings: PushSettings,
}

impl<'a> DailyPush<'a> {
    pub fn new(
        composer: &'a MessageComposer,
        delivery: &'a DeliveryClient,
        ledger: &'a dyn PushLedger,
        settings: PushSettings,
    ) -> Self {
        Self {
            composer,
            delivery,
            ledger,
            archive: None,
            settings,
        }
    }

    /// 设置本地归档目录
    pub fn with_archive(mut self, archive: &'a DailyArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// 执行一次推送
    pub fn run(
        &self,
        input: DailyInput,
        generator: &dyn SummaryGenerator,
        options: RunOptions,
    ) -> Result<PushOutcome> {
        info!(date = %options.date, dry_run = options.dry_run, "Starting daily push");

        let relevant: Vec<Candidate> = input
            .candidates
            .into_iter()
            .filter(|c| c.annotation.relevant)
            .collect();

        if relevant.is_empty() {
            warn!("No AI projects found today, nothing to push");
            return Ok(PushOutcome::NoCandidates);
        }

        let pushed = if options.bypass_dedup {
            info!("Dedup bypassed");
            Default::default()
        } else {
            self.ledger
                .recently_pushed(self.settings.lookback_days, options.date)?
        };

        let selected = select(relevant, &pushed, self.settings.daily_limit);
        if selected.is_empty() {
            info!(
                lookback_days = self.settings.lookback_days,
                "All AI projects were pushed recently, nothing new"
            );
            return Ok(PushOutcome::NothingNew);
        }

        let summary = generator.generate(&selected);
        let mut batch = PushBatch::new(selected, options.date);
        if !summary.text.trim().is_empty() {
            batch = batch.with_summary(summary.text.clone());
        }

        let (digest_msg, summary_msg) = self.composer.push_messages(&batch);

        if options.dry_run {
            info!(
                items = batch.len(),
                digest_bytes = digest_msg.byte_len(),
                summary_bytes = summary_msg.byte_len(),
                "Dry run, messages composed but not sent"
            );
            return Ok(PushOutcome::DryRun {
                digest: digest_msg,
                summary: summary_msg,
            });
        }

        if input.filter_degraded || summary.degraded {
            warn!(
                filter_degraded = input.filter_degraded,
                summary_degraded = summary.degraded,
                "Text generation degraded, skipping push"
            );
            return Ok(PushOutcome::SkippedDegraded {
                filter: input.filter_degraded,
                summary: summary.degraded,
            });
        }

        let archive_path = self.archive.and_then(|archive| {
            match archive.write(batch.date, &self.composer.archive_document(&batch)) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Failed to write daily archive");
                    None
                }
            }
        });

        info!(items = batch.len(), "Sending daily push");
        let report = self.delivery.send_split_pair(&digest_msg, &summary_msg);

        if report.is_success() {
            let ids = batch.ids();
            self.ledger.record_push(&ids, batch.date)?;
            info!(count = ids.len(), "Daily push delivered");
            return Ok(PushOutcome::Delivered {
                ids,
                archive: archive_path,
            });
        }

        error!(state = ?report.state, error = ?report.error, "Daily push failed");
        if self.settings.alert_on_failure {
            self.send_alert(&report.error);
        }

        Ok(PushOutcome::Failed {
            state: report.state,
            error: report.error,
        })
    }

    fn send_alert(&self, cause: &Option<DeliveryError>) {
        let reason = cause
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let content = fit(
            &format!("⚠️ 每日推送失败：{}", reason),
            self.composer.limits().push_markdown_limit,
            msg::TRUNCATED_SUFFIX,
        );
        if let Err(e) = self
            .delivery
            .send(&ComposedMessage::new(MessageKind::Alert, content))
        {
            warn!(error = %e, "Failed to send operator alert");
        }
    }
}
