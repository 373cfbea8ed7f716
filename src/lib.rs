//! GitHub Trend Bot - 每日 AI 趋势项目去重推送

pub mod cli;
pub mod config;
pub mod dedup;
pub mod ledger;
pub mod model;
pub mod notification;
pub mod pipeline;

pub use config::BotConfig;
pub use dedup::{lookback_window, select};
pub use ledger::{MemoryLedger, PushLedger, SqlitePushLedger};
pub use model::{
    Candidate, ComposedMessage, GenerationOutcome, LedgerEntry, MessageKind, PushBatch,
    RankedItem, Reason, RelevanceAnnotation,
};
pub use notification::{DailyArchive, MessageComposer, Rendering, TextMarkers};
pub use pipeline::{DailyInput, DailyPush, PushOutcome, PushSettings, RunOptions, SummaryGenerator};
