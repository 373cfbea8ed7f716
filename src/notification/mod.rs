//! 通知层 - 组装、预算裁剪、投递与归档
//!
//! # 组成
//! 1. `budget`：按 UTF-8 字节裁剪文本
//! 2. `composer`：生成榜单与总结两条消息
//! 3. `delivery`：单条发送 + 缩短重发，两条拆分推送
//! 4. `webhook`：企业微信群机器人通道
//! 5. `archive`：本地留档
//!
//! # 使用示例
//! ```ignore
//! use github_trend_bot::notification::{DeliveryClient, MessageComposer, WebhookClient};
//!
//! let composer = MessageComposer::new(markers, limits)?;
//! let (digest, summary) = composer.push_messages(&batch);
//! let client = DeliveryClient::new(Box::new(WebhookClient::new(config)?));
//! let report = client.send_split_pair(&digest, &summary);
//! ```

pub mod archive;
pub mod budget;
pub mod composer;
pub mod delivery;
pub mod markers;
pub mod webhook;

pub use archive::DailyArchive;
pub use budget::{fit, PUSH_MARKDOWN_LIMIT, RETRY_MARKDOWN_LIMIT, SUMMARY_CONTENT_LIMIT};
pub use composer::{msg, ComposerLimits, MessageComposer, Rendering};
pub use delivery::{
    Delivery, DeliveryClient, DeliveryError, FixedDelay, Pacer, SplitPushReport, SplitPushState,
};
pub use markers::{LeakageDetector, TextMarkers, TopicRule};
pub use webhook::{Transport, TransportError, TransportReply, WebhookClient, WebhookConfig};
