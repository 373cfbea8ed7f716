//! 消息投递 - 单条发送（被拒绝时缩短重发一次）与两条拆分推送
//!
//! # 重试策略
//! - 网络/传输层错误：直接失败，不重试
//! - 应用层拒绝（如内容过长）：裁剪到重试上限后重发一次，最多两次调用
//!
//! # 拆分推送状态
//! `Pending -> FirstSent -> BothSent`，任一步失败进入 `Failed`，
//! 第一条失败时绝不发送第二条。

use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::budget::{self, fit};
use super::webhook::{Transport, TransportError};
use crate::model::{ComposedMessage, MessageKind};

/// 缩短重发时追加的说明
pub const RETRY_SUFFIX: &str = "\n\n…（内容过长，已缩短后重新发送）";

/// 两条消息之间的默认间隔
pub const DEFAULT_INTER_MESSAGE_DELAY: Duration = Duration::from_secs(1);

/// 投递失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 网络或传输层错误，不重试
    #[error("transport error: {0}")]
    Network(#[from] TransportError),
    /// 应用层拒绝（已用完唯一一次缩短重发）
    #[error("rejected by transport (code {code}, attempts {attempts}): {message}")]
    Rejected {
        code: i64,
        message: String,
        attempts: u8,
    },
}

/// 一次成功投递的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// 传输调用次数（1 或 2）
    pub attempts: u8,
    /// 是否经过缩短重发
    pub shrunk: bool,
    /// 实际发送的字节数
    pub bytes_sent: usize,
}

/// 两条消息之间的节流
///
/// 默认实现是固定的挂钟等待；可以替换为令牌桶等其他限流方式。
pub trait Pacer {
    fn pause(&self);
}

/// 固定间隔等待
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_INTER_MESSAGE_DELAY)
    }
}

impl Pacer for FixedDelay {
    fn pause(&self) {
        std::thread::sleep(self.0);
    }
}

/// 拆分推送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPushState {
    Pending,
    FirstSent,
    BothSent,
    /// 在发送指定类型消息时失败
    Failed { stage: MessageKind },
}

impl SplitPushState {
    /// 当前消息发送成功后的下一状态
    fn advance(self) -> Self {
        match self {
            SplitPushState::Pending => SplitPushState::FirstSent,
            SplitPushState::FirstSent => SplitPushState::BothSent,
            other => other,
        }
    }

    fn fail(self, stage: MessageKind) -> Self {
        match self {
            SplitPushState::Pending | SplitPushState::FirstSent => SplitPushState::Failed { stage },
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SplitPushState::BothSent | SplitPushState::Failed { .. })
    }
}

/// 拆分推送结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPushReport {
    pub state: SplitPushState,
    pub deliveries: Vec<Delivery>,
    pub error: Option<DeliveryError>,
}

impl SplitPushReport {
    /// 仅当两条都发送成功时为 true
    pub fn is_success(&self) -> bool {
        self.state == SplitPushState::BothSent
    }
}

/// 投递客户端
pub struct DeliveryClient {
    transport: Box<dyn Transport>,
    pacer: Box<dyn Pacer>,
    retry_markdown_limit: usize,
}

impl DeliveryClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            pacer: Box::new(FixedDelay::default()),
            retry_markdown_limit: budget::RETRY_MARKDOWN_LIMIT,
        }
    }

    /// 设置两条消息之间的节流器
    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// 设置缩短重发的字节上限
    pub fn with_retry_limit(mut self, limit: usize) -> Self {
        self.retry_markdown_limit = limit;
        self
    }

    /// 发送单条消息
    ///
    /// 被拒绝时：若消息已不超过重试上限则直接失败，否则裁剪后重发一次。
    pub fn send(&self, message: &ComposedMessage) -> Result<Delivery, DeliveryError> {
        let channel = self.transport.name();
        let content = message.content.as_str();

        let reply = self.transport.post_markdown(content).map_err(|e| {
            error!(channel, kind = ?message.kind, error = %e, "Message send failed");
            DeliveryError::from(e)
        })?;

        if reply.is_success() {
            info!(channel, kind = ?message.kind, bytes = content.len(), "Message sent");
            return Ok(Delivery {
                attempts: 1,
                shrunk: false,
                bytes_sent: content.len(),
            });
        }

        warn!(
            channel,
            kind = ?message.kind,
            code = reply.code,
            errmsg = %reply.message,
            bytes = content.len(),
            "Message rejected by transport"
        );

        if content.len() <= self.retry_markdown_limit {
            // 已经够短，缩短也无济于事
            return Err(DeliveryError::Rejected {
                code: reply.code,
                message: reply.message,
                attempts: 1,
            });
        }

        let shortened = fit(content, self.retry_markdown_limit, RETRY_SUFFIX);
        let retry = self.transport.post_markdown(&shortened).map_err(|e| {
            error!(channel, kind = ?message.kind, error = %e, "Shortened resend failed");
            DeliveryError::from(e)
        })?;

        if retry.is_success() {
            info!(
                channel,
                kind = ?message.kind,
                bytes = shortened.len(),
                "Shortened message sent"
            );
            Ok(Delivery {
                attempts: 2,
                shrunk: true,
                bytes_sent: shortened.len(),
            })
        } else {
            error!(
                channel,
                kind = ?message.kind,
                code = retry.code,
                errmsg = %retry.message,
                "Shortened message rejected"
            );
            Err(DeliveryError::Rejected {
                code: retry.code,
                message: retry.message,
                attempts: 2,
            })
        }
    }

    /// 依次发送两条消息，第一条成功后等待节流间隔再发第二条
    pub fn send_split_pair(
        &self,
        first: &ComposedMessage,
        second: &ComposedMessage,
    ) -> SplitPushReport {
        let mut state = SplitPushState::Pending;
        let mut deliveries = Vec::with_capacity(2);

        for (idx, message) in [first, second].into_iter().enumerate() {
            if idx > 0 {
                self.pacer.pause();
            }
            match self.send(message) {
                Ok(delivery) => {
                    deliveries.push(delivery);
                    state = state.advance();
                }
                Err(e) => {
                    return SplitPushReport {
                        state: state.fail(message.kind),
                        deliveries,
                        error: Some(e),
                    };
                }
            }
        }

        SplitPushReport {
            state,
            deliveries,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::webhook::TransportReply;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// 按脚本返回结果的 mock 通道
    #[derive(Clone, Default)]
    struct MockTransport {
        replies: Arc<Mutex<VecDeque<Result<TransportReply, TransportError>>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl MockTransport {
        fn scripted(replies: Vec<Result<TransportReply, TransportError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                sent: Arc::default(),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn name(&self) -> &str {
            "mock"
        }

        fn post_markdown(&self, content: &str) -> Result<TransportReply, TransportError> {
            self.sent.lock().unwrap().push(content.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(TransportReply::ok()))
        }
    }

    #[derive(Clone, Default)]
    struct CountingPacer {
        pauses: Arc<AtomicUsize>,
    }

    impl Pacer for CountingPacer {
        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client(transport: &MockTransport, pacer: &CountingPacer) -> DeliveryClient {
        DeliveryClient::new(Box::new(transport.clone())).with_pacer(Box::new(pacer.clone()))
    }

    fn digest(content: impl Into<String>) -> ComposedMessage {
        ComposedMessage::new(MessageKind::Digest, content)
    }

    fn summary(content: impl Into<String>) -> ComposedMessage {
        ComposedMessage::new(MessageKind::Summary, content)
    }

    fn too_long() -> Result<TransportReply, TransportError> {
        Ok(TransportReply::rejected(40058, "markdown.content exceed max length"))
    }

    #[test]
    fn test_send_success_single_attempt() {
        let transport = MockTransport::scripted(vec![Ok(TransportReply::ok())]);
        let delivery = client(&transport, &CountingPacer::default())
            .send(&digest("hello"))
            .unwrap();
        assert_eq!(delivery.attempts, 1);
        assert!(!delivery.shrunk);
        assert_eq!(transport.sent(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_network_error_not_retried() {
        let transport = MockTransport::scripted(vec![Err(TransportError::Request(
            "connection refused".to_string(),
        ))]);
        let err = client(&transport, &CountingPacer::default())
            .send(&digest("x".repeat(3000)))
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Network(_)));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_rejection_short_message_not_retried() {
        let transport = MockTransport::scripted(vec![too_long()]);
        let err = client(&transport, &CountingPacer::default())
            .send(&digest("x".repeat(budget::RETRY_MARKDOWN_LIMIT)))
            .unwrap_err();
        assert_eq!(
            err,
            DeliveryError::Rejected {
                code: 40058,
                message: "markdown.content exceed max length".to_string(),
                attempts: 1,
            }
        );
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_rejection_then_shrunk_resend_succeeds() {
        let transport = MockTransport::scripted(vec![too_long(), Ok(TransportReply::ok())]);
        let original = "中".repeat(1200); // 3600 字节
        let delivery = client(&transport, &CountingPacer::default())
            .send(&digest(original.clone()))
            .unwrap();

        assert_eq!(delivery.attempts, 2);
        assert!(delivery.shrunk);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], original);
        assert!(sent[1].len() <= budget::RETRY_MARKDOWN_LIMIT);
        assert!(sent[1].ends_with(RETRY_SUFFIX));
        assert_eq!(delivery.bytes_sent, sent[1].len());
    }

    #[test]
    fn test_rejection_retry_network_error() {
        let transport = MockTransport::scripted(vec![
            too_long(),
            Err(TransportError::Status(502)),
        ]);
        let err = client(&transport, &CountingPacer::default())
            .send(&digest("x".repeat(3000)))
            .unwrap_err();
        assert_eq!(err, DeliveryError::Network(TransportError::Status(502)));
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn test_split_pair_both_sent_with_pause() {
        let transport = MockTransport::scripted(vec![]);
        let pacer = CountingPacer::default();
        let report = client(&transport, &pacer).send_split_pair(&digest("a"), &summary("b"));

        assert!(report.is_success());
        assert_eq!(report.state, SplitPushState::BothSent);
        assert_eq!(report.deliveries.len(), 2);
        assert!(report.error.is_none());
        assert_eq!(transport.sent(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(pacer.pauses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_split_pair_first_rejected_twice_never_sends_second() {
        let transport = MockTransport::scripted(vec![too_long(), too_long()]);
        let pacer = CountingPacer::default();
        let report = client(&transport, &pacer)
            .send_split_pair(&digest("x".repeat(3700)), &summary("second"));

        assert!(!report.is_success());
        assert_eq!(
            report.state,
            SplitPushState::Failed {
                stage: MessageKind::Digest
            }
        );
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(!sent.contains(&"second".to_string()));
        assert_eq!(pacer.pauses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_split_pair_second_failure() {
        let transport = MockTransport::scripted(vec![
            Ok(TransportReply::ok()),
            Err(TransportError::Request("timeout".to_string())),
        ]);
        let report = client(&transport, &CountingPacer::default())
            .send_split_pair(&digest("a"), &summary("b"));

        assert!(!report.is_success());
        assert_eq!(
            report.state,
            SplitPushState::Failed {
                stage: MessageKind::Summary
            }
        );
        assert_eq!(report.deliveries.len(), 1);
        assert!(matches!(report.error, Some(DeliveryError::Network(_))));
    }

    #[test]
    fn test_state_transitions() {
        let s = SplitPushState::Pending;
        assert_eq!(s.advance(), SplitPushState::FirstSent);
        assert_eq!(s.advance().advance(), SplitPushState::BothSent);
        assert!(s.advance().advance().is_terminal());
        assert!(!s.is_terminal());
        // 终态不再变化
        assert_eq!(
            SplitPushState::BothSent.fail(MessageKind::Summary),
            SplitPushState::BothSent
        );
    }
}
