//! 命令输出格式化

use serde::Serialize;

use crate::model::{ComposedMessage, LedgerEntry};
use crate::pipeline::PushOutcome;

/// JSON 输出
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// 推送结果的一行说明
pub fn describe_outcome(outcome: &PushOutcome) -> String {
    match outcome {
        PushOutcome::NoCandidates => "今日没有 AI 相关项目，未推送".to_string(),
        PushOutcome::NothingNew => "候选项目近期均已推送，未推送".to_string(),
        PushOutcome::SkippedDegraded { filter, summary } => format!(
            "文本生成降级（相关性判断: {}，总结: {}），跳过推送",
            flag(*filter),
            flag(*summary)
        ),
        PushOutcome::DryRun { digest, summary } => format!(
            "dry-run：榜单 {} 字节，总结 {} 字节，未发送",
            digest.byte_len(),
            summary.byte_len()
        ),
        PushOutcome::Delivered { ids, archive } => {
            let mut line = format!("✅ 已推送 {} 个项目: {}", ids.len(), ids.join(", "));
            if let Some(path) = archive {
                line.push_str(&format!("\n📁 归档: {}", path.display()));
            }
            line
        }
        PushOutcome::Failed { state, error } => match error {
            Some(e) => format!("❌ 推送失败 ({:?}): {}", state, e),
            None => format!("❌ 推送失败 ({:?})", state),
        },
    }
}

/// dry-run 打印的两条消息
pub fn render_messages(first: &ComposedMessage, second: &ComposedMessage) -> String {
    format!(
        "===== {:?} ({} bytes) =====\n{}\n\n===== {:?} ({} bytes) =====\n{}",
        first.kind,
        first.byte_len(),
        first.content,
        second.kind,
        second.byte_len(),
        second.content
    )
}

/// 推送历史表格
pub fn format_history(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return "窗口内没有推送记录".to_string();
    }
    let width = entries.iter().map(|e| e.id.len()).max().unwrap_or(0);
    let mut out = format!("{:<10}  {}\n", "DATE", "ID");
    for entry in entries {
        out.push_str(&format!(
            "{}  {:<width$}\n",
            entry.pushed_date.format("%Y-%m-%d"),
            entry.id,
            width = width
        ));
    }
    out.push_str(&format!("共 {} 条", entries.len()));
    out
}

fn flag(value: bool) -> &'static str {
    if value {
        "失败"
    } else {
        "正常"
    }
}
