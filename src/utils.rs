/// Path processing utility functions / 路径处理工具函数

/// Get file extension (lowercase, without the dot) / 获取文件扩展名
pub fn get_ext(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Compute the root-relative path of an entry / 计算相对于根目录的路径
///
/// The result never carries a leading separator; the root itself maps to "".
pub fn relative_path_of(base: &std::path::Path, path: &std::path::Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string_lossy().replace('\\', "/"))
}

/// Check a name against the exclusion set / 检查名称是否命中排除规则
///
/// Patterns are plain names ("node_modules") or `*`-prefixed suffix patterns
/// ("*.log"); trailing `*` matches a prefix (".env*").
pub fn is_excluded_name(name: &str, patterns: &[String]) -> bool {
    for pattern in patterns {
        if let Some(suffix) = pattern.strip_prefix('*') {
            if name.ends_with(suffix) {
                return true;
            }
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            if name.starts_with(prefix) {
                return true;
            }
        } else if name == pattern {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ext() {
        assert_eq!(get_ext("foo.TS"), "ts");
        assert_eq!(get_ext("archive.tar.gz"), "gz");
        assert_eq!(get_ext("Makefile"), "");
    }

    #[test]
    fn test_relative_path_of() {
        use std::path::Path;
        assert_eq!(
            relative_path_of(Path::new("/proj"), Path::new("/proj/src/main.rs")),
            "src/main.rs"
        );
        assert_eq!(relative_path_of(Path::new("/proj"), Path::new("/proj")), "");
    }

    #[test]
    fn test_is_excluded_name() {
        let patterns: Vec<String> = ["node_modules", "*.log", ".env*"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(is_excluded_name("node_modules", &patterns));
        assert!(is_excluded_name("debug.log", &patterns));
        assert!(is_excluded_name(".env.local", &patterns));
        assert!(!is_excluded_name("src", &patterns));
        assert!(!is_excluded_name("logger.rs", &patterns));
    }
}
