//! 字符串工具模块
//! 提供字符串处理相关的工具函数

/// 截断字符串到指定长度（日志中显示 xpub / 地址时使用）
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// 去掉可选的 0x 前缀
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// 检查字符串是否为空或只包含空白字符
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
