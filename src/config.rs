//! 配置加载
//!
//! 配置文件为 JSON，默认位置 `~/.config/github-trend-bot/config.json`，所有字段都有默认值。
//! 环境变量 `TREND_BOT_WEBHOOK_URL` 优先于配置文件中的 webhook 地址。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dedup::{DEFAULT_DAILY_LIMIT, DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};
use crate::notification::budget::{
    PUSH_MARKDOWN_LIMIT, RETRY_MARKDOWN_LIMIT, SUMMARY_CONTENT_LIMIT,
};
use crate::notification::composer::ComposerLimits;
use crate::notification::markers::TextMarkers;
use crate::notification::webhook::{WebhookConfig, DEFAULT_TIMEOUT_SECS};

/// Webhook 地址环境变量
pub const WEBHOOK_URL_ENV: &str = "TREND_BOT_WEBHOOK_URL";

/// Webhook 配置段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// 推送策略配置段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSection {
    /// 每日推送上限
    pub daily_limit: usize,
    /// 去重回看天数（0 表示不去重）
    pub lookback_days: u32,
    /// 单条消息字节上限
    pub push_markdown_limit: usize,
    /// 缩短重发字节上限
    pub retry_markdown_limit: usize,
    /// 总结正文字节预算
    pub summary_content_limit: usize,
    /// 两条消息之间的间隔（毫秒）
    pub inter_message_delay_ms: u64,
    /// 推送失败时是否发送告警
    pub alert_on_failure: bool,
}

impl Default for PushSection {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            push_markdown_limit: PUSH_MARKDOWN_LIMIT,
            retry_markdown_limit: RETRY_MARKDOWN_LIMIT,
            summary_content_limit: SUMMARY_CONTENT_LIMIT,
            inter_message_delay_ms: 1000,
            alert_on_failure: true,
        }
    }
}

impl PushSection {
    pub fn composer_limits(&self) -> ComposerLimits {
        ComposerLimits {
            push_markdown_limit: self.push_markdown_limit,
            summary_content_limit: self.summary_content_limit,
        }
    }

    pub fn inter_message_delay(&self) -> Duration {
        Duration::from_millis(self.inter_message_delay_ms)
    }
}

/// 存储配置段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite 数据库路径
    pub db_path: PathBuf,
    /// 日报归档目录
    pub archive_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/trends.db"),
            archive_dir: PathBuf::from("reports/daily"),
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub webhook: WebhookSection,
    pub push: PushSection,
    pub storage: StorageSection,
    pub markers: TextMarkers,
}

impl BotConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("github-trend-bot")
            .join("config.json")
    }

    /// 加载配置：显式路径必须存在；默认路径不存在时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "Config file not found, using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Using webhook url from {}", WEBHOOK_URL_ENV);
                config.webhook.url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 从文件解析配置（不做环境变量覆盖）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Configuration file not found: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in configuration file: {}", path.display()))?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<()> {
        let push = &self.push;
        if push.daily_limit < 1 {
            return Err(anyhow!("push.daily_limit must be a positive integer"));
        }
        if push.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(anyhow!(
                "push.lookback_days ({}) must not exceed {}",
                push.lookback_days,
                MAX_LOOKBACK_DAYS
            ));
        }
        if push.push_markdown_limit == 0 {
            return Err(anyhow!("push.push_markdown_limit must be greater than 0"));
        }
        if push.retry_markdown_limit >= push.push_markdown_limit {
            return Err(anyhow!(
                "push.retry_markdown_limit ({}) must be smaller than push.push_markdown_limit ({})",
                push.retry_markdown_limit,
                push.push_markdown_limit
            ));
        }
        if push.summary_content_limit > push.push_markdown_limit {
            return Err(anyhow!(
                "push.summary_content_limit must not exceed push.push_markdown_limit"
            ));
        }
        if self.webhook.timeout_secs == 0 {
            return Err(anyhow!("webhook.timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig {
            url: self.webhook.url.clone(),
            timeout_secs: self.webhook.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let config = BotConfig::default();
        assert_eq!(config.push.daily_limit, 5);
        assert_eq!(config.push.lookback_days, 7);
        assert_eq!(config.push.push_markdown_limit, 3800);
        assert_eq!(config.push.retry_markdown_limit, 2500);
        assert_eq!(config.push.summary_content_limit, 2600);
        assert_eq!(config.push.inter_message_delay(), Duration::from_secs(1));
        assert_eq!(config.webhook.timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"webhook": {{"url": "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=k"}}, "push": {{"daily_limit": 3}}}}"#
        )
        .unwrap();

        let config = BotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.push.daily_limit, 3);
        assert_eq!(config.push.lookback_days, 7);
        assert!(config.webhook.url.contains("key=k"));
        assert_eq!(config.storage.db_path, PathBuf::from("data/trends.db"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = BotConfig::load(Some(Path::new("/nonexistent/trend-bot/config.json")));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = BotConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = BotConfig::default();
        config.push.daily_limit = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.push.retry_markdown_limit = 3800;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("retry_markdown_limit"));

        let mut config = BotConfig::default();
        config.webhook.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_lookback() {
        let mut config = BotConfig::default();
        config.push.lookback_days = 200_000_000;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("lookback_days"));

        config.push.lookback_days = MAX_LOOKBACK_DAYS;
        assert!(config.validate().is_ok());
    }
}
