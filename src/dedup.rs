//! 推送去重 - 防止同一项目在回看窗口内被重复推送
//!
//! ## 去重策略
//! 1. 回看窗口按日期计算，包含首尾两天：`[reference - (days - 1), reference]`
//! 2. 窗口内推送过的项目直接剔除，保持原有排名顺序
//! 3. 剔除后取前 `limit` 个，不重新排序

use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use tracing::debug;

use crate::model::Candidate;

/// 默认每日推送上限
pub const DEFAULT_DAILY_LIMIT: usize = 5;

/// 默认回看天数
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// 回看天数上限（配置校验使用）
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// 回看窗口（闭区间）；`days < 1` 时返回 None，表示不去重
///
/// 起始日期超出可表示范围时窗口退化为全部历史。
pub fn lookback_window(reference: NaiveDate, days: u32) -> Option<(NaiveDate, NaiveDate)> {
    if days < 1 {
        return None;
    }
    let start = reference
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN);
    Some((start, reference))
}

/// 选出可推送的项目
///
/// `candidates` 已按排名升序排列；同一 ID 在列表中重复出现时只保留第一次。
pub fn select(candidates: Vec<Candidate>, pushed: &HashSet<String>, limit: usize) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let total = candidates.len();

    let selected: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            if pushed.contains(c.id()) {
                debug!(id = %c.id(), "Skipping recently pushed item");
                return false;
            }
            seen.insert(c.id().to_string())
        })
        .take(limit)
        .collect();

    debug!(
        total,
        excluded = pushed.len(),
        selected = selected.len(),
        limit,
        "Push candidates selected"
    );
    selected
}
