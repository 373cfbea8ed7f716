//! 领域数据模型 - 趋势项目、AI 相关性标注和推送批次

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::notification::markers::TextMarkers;

/// 趋势榜单中的单个项目（由上游采集器产生，只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    /// 唯一标识（如 owner/name）
    pub id: String,
    /// 展示标题
    pub title: String,
    /// 项目描述
    #[serde(default)]
    pub description: String,
    /// 分类标签（编程语言）
    #[serde(default)]
    pub category: String,
    /// 项目链接
    pub url: String,
    /// star 总数
    #[serde(default)]
    pub popularity: u64,
    /// star 增长
    #[serde(default)]
    pub popularity_delta: i64,
    /// 榜单排名（从 1 开始）
    pub rank: u32,
}

/// AI 相关性理由
///
/// 在生成处打标签，而不是事后靠子串匹配猜测是否为占位文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// 文本生成器给出的理由
    Generated(String),
    /// 关键词兜底判断（生成器不可用）
    Fallback {
        /// 命中的关键词
        #[serde(default)]
        basis: String,
    },
}

impl Reason {
    /// 对只有纯文本的输入（旧版采集器）进行分类
    pub fn classify(text: &str, markers: &TextMarkers) -> Self {
        if markers.is_fallback_reason(text) {
            Reason::Fallback {
                basis: text.trim().to_string(),
            }
        } else {
            Reason::Generated(text.trim().to_string())
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Reason::Fallback { .. })
    }
}

/// 与 RankedItem 一一对应的相关性标注
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceAnnotation {
    /// 是否与 AI 相关
    pub relevant: bool,
    /// 判断理由
    pub reason: Reason,
}

impl RelevanceAnnotation {
    pub fn generated(relevant: bool, reason: impl Into<String>) -> Self {
        Self {
            relevant,
            reason: Reason::Generated(reason.into()),
        }
    }

    pub fn fallback(relevant: bool, basis: impl Into<String>) -> Self {
        Self {
            relevant,
            reason: Reason::Fallback {
                basis: basis.into(),
            },
        }
    }
}

/// 候选项目：项目 + 标注
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub item: RankedItem,
    pub annotation: RelevanceAnnotation,
}

impl Candidate {
    pub fn new(item: RankedItem, annotation: RelevanceAnnotation) -> Self {
        Self { item, annotation }
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }
}

/// 一次推送的项目批次
#[derive(Debug, Clone)]
pub struct PushBatch {
    /// 按排名排序的入选项目
    pub entries: Vec<Candidate>,
    /// 推送日期
    pub date: NaiveDate,
    /// 可选的总结文本
    pub summary: Option<String>,
}

impl PushBatch {
    pub fn new(entries: Vec<Candidate>, date: NaiveDate) -> Self {
        Self {
            entries,
            date,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 批次内所有项目 ID（用于写入推送记录）
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.item.id.clone()).collect()
    }
}

/// 推送记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub pushed_date: NaiveDate,
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// 项目榜单
    Digest,
    /// AI 总结与业务价值分析
    Summary,
    /// 运维告警
    Alert,
}

/// 已完成预算裁剪、可直接发送的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub kind: MessageKind,
    pub content: String,
}

impl ComposedMessage {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    /// UTF-8 字节长度
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }
}

/// 文本生成协作者的返回值
///
/// `degraded` 表示生成器失败并使用了兜底内容，由编排器决定是否继续推送。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub degraded: bool,
}

impl GenerationOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: false,
        }
    }

    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: true,
        }
    }
}
