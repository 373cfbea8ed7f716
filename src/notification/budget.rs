//! 字节预算裁剪
//!
//! 企业微信 markdown 消息按 UTF-8 字节计算长度上限，中文一个字占 3 字节，
//! 所以不能按字符数截断。这里的裁剪只在字符边界上切，保证结果仍是合法 UTF-8。

/// 单条推送消息的字节上限
pub const PUSH_MARKDOWN_LIMIT: usize = 3800;

/// 被拒绝后重发时的字节上限
pub const RETRY_MARKDOWN_LIMIT: usize = 2500;

/// 总结正文的字节预算（预留标题和页脚的空间）
pub const SUMMARY_CONTENT_LIMIT: usize = 2600;

/// 将文本裁剪到 `max_bytes` 字节以内
///
/// - 未超出上限时原样返回
/// - 超出时为 `suffix` 预留空间，在字符边界上二分查找能放下的最长前缀，再拼接 `suffix`
/// - `suffix` 本身超过上限时，只返回 `suffix` 的安全截断
pub fn fit(text: &str, max_bytes: usize, suffix: &str) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    if suffix.len() > max_bytes {
        return byte_safe_prefix(suffix, max_bytes).to_string();
    }

    let available = max_bytes - suffix.len();

    // boundaries[k] = 前 k 个字符的字节长度，单调递增
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();

    // boundaries[0] == 0 总是满足条件，所以 count >= 1
    let count = boundaries.partition_point(|&len| len <= available);
    let end = boundaries[count - 1];

    let mut out = String::with_capacity(end + suffix.len());
    out.push_str(&text[..end]);
    out.push_str(suffix);
    out
}

/// 取不超过 `max_bytes` 字节的最长前缀，不切断多字节字符
pub fn byte_safe_prefix(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// 按字符数截断，超出时追加 `...`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}...", &text[..offset]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_identity_below_limit() {
        assert_eq!(fit("hello", 5, "…"), "hello");
        assert_eq!(fit("你好", 6, "[cut]"), "你好");
        assert_eq!(fit("", 0, "[cut]"), "");
    }

    #[test]
    fn test_fit_ascii_with_suffix() {
        let out = fit("abcdefghij", 8, "..");
        assert_eq!(out, "abcdef..");
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_fit_never_splits_multibyte_char() {
        // 每个汉字 3 字节，可用 10 - 2 = 8 字节，只能放下 2 个字
        let out = fit("这是一个测试", 10, "..");
        assert_eq!(out, "这是..");
        assert!(out.len() <= 10);
    }

    #[test]
    fn test_fit_mixed_width_chars() {
        let text = "a你😀b好".repeat(50);
        for max in 0..text.len() {
            let out = fit(&text, max, "（截断）");
            assert!(out.len() <= max, "max={} got={}", max, out.len());
            assert!(!out.contains('\u{FFFD}'));
        }
    }

    #[test]
    fn test_fit_suffix_larger_than_limit() {
        let out = fit("正文内容很长很长", 7, "（内容已截断）");
        // 后缀本身 21 字节，只保留前两个字
        assert_eq!(out, "（内");
        assert!(out.len() <= 7);
    }

    #[test]
    fn test_fit_zero_budget() {
        assert_eq!(fit("abc", 0, "..."), "");
        assert_eq!(fit("abc", 0, ""), "");
    }

    #[test]
    fn test_fit_empty_suffix_uses_full_budget() {
        let out = fit("中文abc", 4, "");
        assert_eq!(out, "中");
    }

    #[test]
    fn test_byte_safe_prefix() {
        assert_eq!(byte_safe_prefix("中文", 4), "中");
        assert_eq!(byte_safe_prefix("中文", 2), "");
        assert_eq!(byte_safe_prefix("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_chars("this is a long text", 10), "this is a ...");
        assert_eq!(truncate_chars("这是一个非常长的中文描述", 4), "这是一个...");
    }
}
