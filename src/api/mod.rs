pub mod files;
pub mod search;
pub mod server;

/// Parse "true"/"false" style query parameters / 解析布尔查询参数
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => matches!(v, "true" | "1"),
        None => default,
    }
}

/// Parse numeric query parameters with a fallback / 解析数字查询参数
pub fn parse_usize(value: Option<&str>, default: usize) -> usize {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
