//! 文本标记配置 - 泄露标记、兜底理由短语、主题关键词
//!
//! 这些都是产品文案层面的数据，放在配置里而不是写死在逻辑中，
//! 可以通过配置文件的 `markers` 段扩展。

use anyhow::{Context, Result};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

/// 主题推断规则：描述命中任一关键词时使用对应的说明句
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRule {
    /// 主题名称（日志用）
    pub name: String,
    /// 小写关键词
    pub keywords: Vec<String>,
    /// 展示用说明句
    pub sentence: String,
}

/// 文本标记集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMarkers {
    /// 生成器把内部/系统/文件路径内容回显出来时会出现的子串（大小写不敏感）
    pub leakage_markers: Vec<String>,
    /// 旧版采集器的兜底理由文本特征
    pub fallback_phrases: Vec<String>,
    /// 按顺序匹配的主题规则
    pub topics: Vec<TopicRule>,
    /// 无主题命中时的通用说明
    pub generic_sentence: String,
}

impl Default for TextMarkers {
    fn default() -> Self {
        Self {
            leakage_markers: vec![
                "/Users/".to_string(),
                "/home/".to_string(),
                "/root/".to_string(),
                "C:\\".to_string(),
                "file://".to_string(),
                "<system".to_string(),
                "system-reminder".to_string(),
                "system prompt".to_string(),
                "Traceback (most recent call last)".to_string(),
                "（生成总结失败）".to_string(),
            ],
            fallback_phrases: vec![
                "keyword-based detection".to_string(),
                "llm unavailable".to_string(),
                "关键词匹配".to_string(),
                "模型不可用".to_string(),
            ],
            topics: vec![
                TopicRule {
                    name: "agent".to_string(),
                    keywords: vec![
                        "agent".to_string(),
                        "assistant".to_string(),
                        "copilot".to_string(),
                        "autonomous".to_string(),
                        "智能体".to_string(),
                    ],
                    sentence: "项目聚焦智能体（Agent）方向，可用于构建自动化AI助手与工作流。"
                        .to_string(),
                },
                TopicRule {
                    name: "llm-app".to_string(),
                    keywords: vec![
                        "llm".to_string(),
                        "gpt".to_string(),
                        "language model".to_string(),
                        "rag".to_string(),
                        "chatbot".to_string(),
                        "prompt".to_string(),
                        "大模型".to_string(),
                    ],
                    sentence: "项目属于大语言模型应用方向，可用于搭建基于LLM的问答、检索与生成服务。"
                        .to_string(),
                },
                TopicRule {
                    name: "vision".to_string(),
                    keywords: vec![
                        "vision".to_string(),
                        "image".to_string(),
                        "video".to_string(),
                        "multimodal".to_string(),
                        "multi-modal".to_string(),
                        "diffusion".to_string(),
                        "ocr".to_string(),
                        "多模态".to_string(),
                    ],
                    sentence: "项目涉及视觉/多模态AI方向，可用于图像、视频等内容的理解与生成。"
                        .to_string(),
                },
            ],
            generic_sentence: "项目与AI技术相关，值得关注其在实际业务中的应用潜力。".to_string(),
        }
    }
}

impl TextMarkers {
    /// 纯文本理由是否为兜底占位文本
    pub fn is_fallback_reason(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.fallback_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && lower.contains(&phrase.to_lowercase()))
    }

    /// 根据描述推断主题说明句
    pub fn topic_sentence(&self, description: &str) -> &str {
        let lower = description.to_lowercase();
        self.topics
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|kw| !kw.is_empty() && lower.contains(&kw.to_lowercase()))
            })
            .map(|rule| rule.sentence.as_str())
            .unwrap_or(&self.generic_sentence)
    }
}

/// 泄露检测器（由 `leakage_markers` 编译而来）
#[derive(Debug, Clone)]
pub struct LeakageDetector {
    set: RegexSet,
    markers: Vec<String>,
}

impl LeakageDetector {
    pub fn new(markers: &[String]) -> Result<Self> {
        let markers: Vec<String> = markers.iter().filter(|m| !m.is_empty()).cloned().collect();
        let set = RegexSetBuilder::new(markers.iter().map(|m| regex::escape(m)))
            .case_insensitive(true)
            .build()
            .context("Failed to compile leakage markers")?;
        Ok(Self { set, markers })
    }

    /// 文本是否包含任一泄露标记
    pub fn is_leaked(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// 命中的标记（日志用）
    pub fn matched<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.set
            .matches(text)
            .into_iter()
            .map(|idx| self.markers[idx].as_str())
            .collect()
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}
