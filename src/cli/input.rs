//! 采集器输入文件解析
//!
//! 格式：
//! ```json
//! {
//!   "date": "2026-02-12",
//!   "items": [{"id": "owner/name", "title": "...", "url": "...", "rank": 1,
//!              "relevant": true, "reason": "..."}],
//!   "filter_degraded": false,
//!   "summary": {"text": "...", "degraded": false}
//! }
//! ```
//! `reason` 可以是带标签的对象（`{"generated": "..."}` / `{"fallback": {"basis": "..."}}`），
//! 也可以是旧版采集器输出的纯文本，纯文本按兜底短语分类。

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::model::{Candidate, GenerationOutcome, RankedItem, Reason, RelevanceAnnotation};
use crate::notification::markers::TextMarkers;
use crate::pipeline::{DailyInput, PresetSummary};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReason {
    Tagged(Reason),
    Plain(String),
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(flatten)]
    item: RankedItem,
    #[serde(default)]
    relevant: bool,
    #[serde(default)]
    reason: Option<RawReason>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    items: Vec<RawItem>,
    #[serde(default)]
    filter_degraded: bool,
    #[serde(default)]
    summary: Option<GenerationOutcome>,
}

/// 解析后的采集结果
#[derive(Debug, Clone)]
pub struct CollectorInput {
    pub date: Option<NaiveDate>,
    pub daily: DailyInput,
    pub summary: PresetSummary,
}

impl CollectorInput {
    /// 从 JSON 文本解析
    pub fn parse(json: &str, markers: &TextMarkers) -> Result<Self> {
        let raw: RawInput = serde_json::from_str(json).context("Invalid collector input JSON")?;

        let mut candidates: Vec<Candidate> = raw
            .items
            .into_iter()
            .map(|raw_item| {
                let reason = match raw_item.reason {
                    Some(RawReason::Tagged(reason)) => reason,
                    Some(RawReason::Plain(text)) => Reason::classify(&text, markers),
                    None => Reason::Generated(String::new()),
                };
                Candidate::new(
                    raw_item.item,
                    RelevanceAnnotation {
                        relevant: raw_item.relevant,
                        reason,
                    },
                )
            })
            .collect();
        // 排名是唯一的排序依据
        candidates.sort_by_key(|c| c.item.rank);

        debug!(
            items = candidates.len(),
            filter_degraded = raw.filter_degraded,
            "Collector input parsed"
        );

        Ok(Self {
            date: raw.date,
            daily: DailyInput {
                candidates,
                filter_degraded: raw.filter_degraded,
            },
            summary: PresetSummary(raw.summary.unwrap_or_default()),
        })
    }

    /// 从文件读取；路径为 `-` 时读取标准输入
    pub fn load(path: &Path, markers: &TextMarkers) -> Result<Self> {
        let content = if path == Path::new("-") {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read collector input from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read collector input {}", path.display()))?
        };
        Self::parse(&content, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "date": "2026-02-12",
        "items": [
            {"id": "b/two", "title": "two", "url": "https://github.com/b/two", "rank": 2,
             "relevant": true, "reason": {"fallback": {"basis": "llm"}}},
            {"id": "a/one", "title": "one", "description": "An agent framework",
             "category": "Python", "url": "https://github.com/a/one", "rank": 1,
             "popularity": 12000, "popularity_delta": 350,
             "relevant": true, "reason": "多智能体编排框架"},
            {"id": "c/three", "title": "three", "url": "https://github.com/c/three", "rank": 3}
        ],
        "summary": {"text": "今日趋势", "degraded": false}
    }"#;

    #[test]
    fn test_parse_sorts_by_rank_and_reads_fields() {
        let input = CollectorInput::parse(SAMPLE, &TextMarkers::default()).unwrap();
        let ids: Vec<&str> = input.daily.candidates.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["a/one", "b/two", "c/three"]);

        let first = &input.daily.candidates[0];
        assert_eq!(first.item.popularity, 12000);
        assert_eq!(first.item.popularity_delta, 350);
        assert_eq!(
            first.annotation.reason,
            Reason::Generated("多智能体编排框架".to_string())
        );
        assert_eq!(input.date, NaiveDate::from_ymd_opt(2026, 2, 12));
        assert_eq!(input.summary.0.text, "今日趋势");
        assert!(!input.daily.filter_degraded);
    }

    #[test]
    fn test_tagged_fallback_and_missing_relevance() {
        let input = CollectorInput::parse(SAMPLE, &TextMarkers::default()).unwrap();
        assert!(input.daily.candidates[1].annotation.reason.is_fallback());
        // 未标注的项目视为不相关
        assert!(!input.daily.candidates[2].annotation.relevant);
    }

    #[test]
    fn test_plain_fallback_phrase_classified() {
        let markers = TextMarkers::default();
        let phrase = markers.fallback_phrases[0].clone();
        let json = format!(
            r#"{{"items": [{{"id": "x/y", "title": "y", "url": "u", "rank": 1,
                "relevant": true, "reason": "{}"}}]}}"#,
            phrase
        );
        let input = CollectorInput::parse(&json, &markers).unwrap();
        assert!(input.daily.candidates[0].annotation.reason.is_fallback());
        assert!(input.date.is_none());
        assert!(!input.summary.0.degraded);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(CollectorInput::parse("{ nope", &TextMarkers::default()).is_err());
    }
}
