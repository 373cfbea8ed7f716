//! 消息组装 - 将推送批次转换为企业微信 markdown 文本
//!
//! 每日推送拆成两条消息：
//! 1. 项目榜单（Digest）
//! 2. AI 智能总结 & 业务价值分析（Summary）
//!
//! 推送渲染会按字节预算裁剪；归档渲染保留完整内容，用于本地留档。
//! 上游文本的质量问题（空总结、泄露内容、兜底理由）都在这里消化，不会阻塞推送。

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use super::budget::{self, fit, truncate_chars};
use super::markers::{LeakageDetector, TextMarkers};
use crate::model::{Candidate, ComposedMessage, MessageKind, PushBatch, Reason};

/// 消息文案常量
pub mod msg {
    pub const DIGEST_TITLE: &str = "🔥 **今日GitHub AI趋势 Top";
    pub const SUMMARY_TITLE: &str = "📝 **AI智能总结 & 业务价值分析**";
    pub const SEPARATOR: &str = "\n---\n";
    pub const FOOTER: &str = "\n---\n⏰ 由GitHub-Trend-Bot自动推送";

    pub const CATEGORY_UNKNOWN: &str = "未知";
    pub const HIGHLIGHT: &str = "💡 AI亮点：";
    pub const VIEW_PROJECT: &str = "查看项目";

    // 总结正文的两个必需段落
    pub const SUMMARY_HEADING: &str = "**每日趋势总结**";
    pub const VALUE_HEADING: &str = "🚀 **业务价值分析**";
    pub const SUMMARY_MARKER: &str = "趋势总结";
    pub const VALUE_MARKER: &str = "业务价值分析";
    pub const NO_DIRECT_VALUE: &str = "暂未发现明确的直接业务价值，建议持续关注。";

    pub const TRUNCATED_SUFFIX: &str = "\n\n…（内容过长，已截断）";
    pub const SUMMARY_SHORTENED_SUFFIX: &str = "\n\n…（内容较长，已精简）";
}

/// 各数字序号的 emoji（1-10）
const RANK_MARKERS: [&str; 10] = [
    "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟",
];

/// 渲染目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// 推送到企业微信（受字节预算约束）
    Push,
    /// 本地归档（不裁剪）
    Archive,
}

impl Rendering {
    fn description_cap(self) -> usize {
        match self {
            Rendering::Push => 80,
            Rendering::Archive => 100,
        }
    }

    fn reason_cap(self) -> Option<usize> {
        match self {
            Rendering::Push => Some(120),
            Rendering::Archive => None,
        }
    }
}

/// 组装器的字节预算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerLimits {
    pub push_markdown_limit: usize,
    pub summary_content_limit: usize,
}

impl Default for ComposerLimits {
    fn default() -> Self {
        Self {
            push_markdown_limit: budget::PUSH_MARKDOWN_LIMIT,
            summary_content_limit: budget::SUMMARY_CONTENT_LIMIT,
        }
    }
}

/// 消息组装器
#[derive(Debug, Clone)]
pub struct MessageComposer {
    markers: TextMarkers,
    leakage: LeakageDetector,
    headings: SectionHeadings,
    limits: ComposerLimits,
}

impl MessageComposer {
    pub fn new(markers: TextMarkers, limits: ComposerLimits) -> Result<Self> {
        let leakage = LeakageDetector::new(&markers.leakage_markers)?;
        Ok(Self {
            markers,
            leakage,
            headings: SectionHeadings::new()?,
            limits,
        })
    }

    pub fn limits(&self) -> ComposerLimits {
        self.limits
    }

    /// 展示用的理由文本，兜底理由改写为可读的主题说明
    pub fn display_reason(&self, candidate: &Candidate) -> String {
        match &candidate.annotation.reason {
            Reason::Generated(text) if !text.trim().is_empty() => text.trim().to_string(),
            Reason::Generated(_) => self.markers.generic_sentence.clone(),
            Reason::Fallback { basis } => {
                debug!(
                    id = %candidate.item.id,
                    basis = %basis,
                    "Rewriting fallback relevance reason"
                );
                self.markers
                    .topic_sentence(&candidate.item.description)
                    .to_string()
            }
        }
    }

    /// 项目榜单
    pub fn digest(&self, batch: &PushBatch, rendering: Rendering) -> String {
        let mut lines = vec![
            format!("{} {}**", msg::DIGEST_TITLE, batch.len()),
            format!("\n📅 {}", batch.date.format("%Y-%m-%d")),
            msg::SEPARATOR.to_string(),
        ];

        for (idx, candidate) in batch.entries.iter().enumerate() {
            lines.extend(self.render_item(idx + 1, candidate, rendering));
        }

        lines.push(msg::FOOTER.to_string());
        let digest = lines.join("\n");

        match rendering {
            Rendering::Push => fit(&digest, self.limits.push_markdown_limit, msg::TRUNCATED_SUFFIX),
            Rendering::Archive => digest,
        }
    }

    fn render_item(&self, position: usize, candidate: &Candidate, rendering: Rendering) -> Vec<String> {
        let item = &candidate.item;
        let category = if item.category.trim().is_empty() {
            msg::CATEGORY_UNKNOWN
        } else {
            item.category.trim()
        };

        let description = truncate_chars(item.description.trim(), rendering.description_cap());
        let reason = self.display_reason(candidate);
        let reason = match rendering.reason_cap() {
            Some(cap) => truncate_chars(&reason, cap),
            None => reason,
        };

        vec![
            format!(
                "\n{} **{}** ⭐ {} ({:+})",
                rank_marker(position),
                item.title,
                format_thousands(item.popularity),
                item.popularity_delta
            ),
            format!("🏷 {}", category),
            format!("📝 {}", description),
            format!("{}{}", msg::HIGHLIGHT, reason),
            format!("🔗 [{}]({})\n", msg::VIEW_PROJECT, item.url),
        ]
    }

    /// 总结正文
    ///
    /// 上游文本为空或命中泄露标记时使用确定性的兜底总结；
    /// 否则裁剪到总结预算，并确保包含两个必需段落。
    pub fn compose_summary(&self, free_text: Option<&str>, items: &[Candidate]) -> String {
        let text = free_text.map(str::trim).unwrap_or_default();

        if text.is_empty() {
            debug!("Summary text is empty, using fallback summary");
            return self.fallback_summary(items);
        }

        if self.leakage.is_leaked(text) {
            warn!(
                markers = ?self.leakage.matched(text),
                "Summary text contains leaked content, using fallback summary"
            );
            return self.fallback_summary(items);
        }

        self.fit_sections(text)
    }

    /// 补齐缺少的段落标题，并把正文裁剪到总结预算
    ///
    /// 业务价值段落最多占一半预算，超出部分从趋势总结段落末尾裁掉，
    /// 保证已有的业务价值标题不会被截断。
    fn fit_sections(&self, text: &str) -> String {
        let limit = self.limits.summary_content_limit;
        let has_summary = self.headings.summary.is_match(text);

        let prefix = if has_summary {
            String::new()
        } else {
            format!("{}\n\n", msg::SUMMARY_HEADING)
        };
        let (head, tail, sep) = match self.headings.value.find(text) {
            Some(m) => {
                // 标题所在行整行归入业务价值段落
                let start = text[..m.start()].rfind('\n').map_or(0, |i| i + 1);
                (&text[..start], text[start..].to_string(), "")
            }
            None => (
                text,
                format!("{}\n\n{}", msg::VALUE_HEADING, msg::NO_DIRECT_VALUE),
                "\n\n",
            ),
        };

        if prefix.len() + head.len() + sep.len() + tail.len() <= limit {
            return format!("{}{}{}{}", prefix, head, sep, tail);
        }

        const JOINT: &str = "\n\n";
        let tail_budget = tail.len().min(limit / 2);
        let head_budget = limit.saturating_sub(prefix.len() + JOINT.len() + tail_budget);
        let tail = fit(&tail, tail_budget, msg::SUMMARY_SHORTENED_SUFFIX);
        let head = fit(head.trim_end(), head_budget, msg::SUMMARY_SHORTENED_SUFFIX);
        debug!(limit, head = head.len(), tail = tail.len(), "Summary text shortened");

        format!("{}{}{}{}", prefix, head, JOINT, tail)
    }

    /// 兜底总结：列出前 3 个项目 + 固定的业务价值三条
    pub fn fallback_summary(&self, items: &[Candidate]) -> String {
        let names: Vec<&str> = items.iter().take(3).map(|c| c.item.title.as_str()).collect();

        let overview = if names.is_empty() {
            "今日入选的AI项目".to_string()
        } else if items.len() > names.len() {
            format!("今日入选的AI项目包括 {} 等", names.join("、"))
        } else {
            format!("今日入选的AI项目包括 {}", names.join("、"))
        };

        format!(
            "{}\n\n{}，整体围绕大模型应用、智能体与AI工程化工具展开，建议关注其在实际场景中的落地效果。\n\n{}\n\n\
             - **搜索**：关注检索增强与语义理解类项目，评估其对搜索相关性的提升空间。\n\
             - **推荐**：关注多模态理解与内容生成能力，探索提升推荐多样性与内容质量的可能。\n\
             - **AI基础设施**：关注推理加速与部署工具，评估降低训练和推理成本的潜力。",
            msg::SUMMARY_HEADING,
            overview,
            msg::VALUE_HEADING
        )
    }

    /// 总结消息（标题 + 日期 + 正文 + 页脚）
    pub fn summary_message(&self, batch: &PushBatch, rendering: Rendering) -> String {
        let body = self.compose_summary(batch.summary.as_deref(), &batch.entries);
        let message = [
            msg::SUMMARY_TITLE.to_string(),
            format!("\n📅 {}", batch.date.format("%Y-%m-%d")),
            msg::SEPARATOR.to_string(),
            body,
            msg::FOOTER.to_string(),
        ]
        .join("\n");

        match rendering {
            Rendering::Push => fit(&message, self.limits.push_markdown_limit, msg::TRUNCATED_SUFFIX),
            Rendering::Archive => message,
        }
    }

    /// 拆分推送的两条消息，各自独立满足推送字节预算
    pub fn push_messages(&self, batch: &PushBatch) -> (ComposedMessage, ComposedMessage) {
        let limit = self.limits.push_markdown_limit;
        let digest = self.digest(batch, Rendering::Push);
        let summary = self.summary_message(batch, Rendering::Push);

        (
            ComposedMessage::new(MessageKind::Digest, fit(&digest, limit, msg::TRUNCATED_SUFFIX)),
            ComposedMessage::new(MessageKind::Summary, fit(&summary, limit, msg::TRUNCATED_SUFFIX)),
        )
    }

    /// 本地归档文档：榜单与总结合并为一份，页脚只保留一次
    pub fn archive_document(&self, batch: &PushBatch) -> String {
        let digest = self.digest(batch, Rendering::Archive);
        let summary = self.summary_message(batch, Rendering::Archive);

        [
            strip_footer(&digest),
            msg::SEPARATOR,
            strip_footer(&summary),
            msg::FOOTER,
        ]
        .join("\n")
    }
}

/// 总结正文的两个必需段落标题（markdown 加粗形式）
#[derive(Debug, Clone)]
struct SectionHeadings {
    summary: Regex,
    value: Regex,
}

impl SectionHeadings {
    fn new() -> Result<Self> {
        Ok(Self {
            summary: heading_pattern(msg::SUMMARY_MARKER)?,
            value: heading_pattern(msg::VALUE_MARKER)?,
        })
    }
}

/// `**...关键词...**` 或 `# ...关键词...` 形式的标题
fn heading_pattern(keyword: &str) -> Result<Regex> {
    let keyword = regex::escape(keyword);
    Ok(Regex::new(&format!(
        r"\*\*[^*\n]*{k}[^*\n]*\*\*|(?m)^#{{1,6}}[^\n]*{k}",
        k = keyword
    ))?)
}

fn strip_footer(text: &str) -> &str {
    match text.rfind(msg::FOOTER) {
        Some(pos) => &text[..pos],
        None => text,
    }
}

/// 序号标记：1-10 使用 emoji，之后回退为 `N.`
pub fn rank_marker(position: usize) -> String {
    match position {
        1..=10 => RANK_MARKERS[position - 1].to_string(),
        _ => format!("{}.", position),
    }
}

/// 千分位格式化
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
