//! 企业微信群机器人 Webhook 客户端
//!
//! 发送 markdown 消息并解析应用层返回码（`errcode == 0` 表示成功）。

use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 应用层成功返回码
pub const SUCCESS_CODE: i64 = 0;

/// 响应中缺少 errcode 时使用的返回码
pub const UNKNOWN_CODE: i64 = -1;

/// 默认超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 传输层错误（网络、HTTP 状态、响应无法解析），不会重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),
}

/// 传输层已完成调用时的应用层回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub code: i64,
    pub message: String,
}

impl TransportReply {
    pub fn ok() -> Self {
        Self {
            code: SUCCESS_CODE,
            message: "ok".to_string(),
        }
    }

    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// 消息传输通道
pub trait Transport {
    /// 通道名称（用于日志）
    fn name(&self) -> &str;

    /// 发送一条 markdown 消息
    fn post_markdown(&self, content: &str) -> Result<TransportReply, TransportError>;
}

/// Webhook 客户端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Webhook URL（含 key 参数）
    pub url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub msgtype: &'static str,
    pub markdown: MarkdownContent<'a>,
}

#[derive(Debug, Serialize)]
pub struct MarkdownContent<'a> {
    pub content: &'a str,
}

impl<'a> WebhookPayload<'a> {
    pub fn markdown(content: &'a str) -> Self {
        Self {
            msgtype: "markdown",
            markdown: MarkdownContent { content },
        }
    }
}

/// Webhook 响应
#[derive(Debug, Deserialize)]
pub struct WebhookResponse {
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

impl From<WebhookResponse> for TransportReply {
    fn from(resp: WebhookResponse) -> Self {
        Self {
            code: resp.errcode.unwrap_or(UNKNOWN_CODE),
            message: resp.errmsg.unwrap_or_default(),
        }
    }
}

/// 企业微信 Webhook 客户端
#[derive(Debug)]
pub struct WebhookClient {
    client: Client,
    config: WebhookConfig,
}

impl WebhookClient {
    /// 创建新的 Webhook 客户端
    pub fn new(config: WebhookConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(anyhow!("webhook url is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }
}

impl Transport for WebhookClient {
    fn name(&self) -> &str {
        "wecom"
    }

    fn post_markdown(&self, content: &str) -> Result<TransportReply, TransportError> {
        let payload = WebhookPayload::markdown(content);

        debug!(
            bytes = content.len(),
            timeout_secs = self.config.timeout_secs,
            "Posting markdown to webhook"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .map_err(|e| {
                TransportError::Request(format!("after {}ms: {}", start.elapsed().as_millis(), e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body: WebhookResponse = response
            .json()
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(body.into())
    }
}
