//! Error types for the file search backend / 文件搜索后端的错误类型
//!
//! Validation and not-found conditions are surfaced to clients directly;
//! provider and parse failures are recovered inside the ranker and only
//! logged. External tool failures have no fallback and become server errors.

use thiserror::Error;

/// Application error taxonomy / 应用错误分类
#[derive(Debug, Error)]
pub enum SearchError {
    /// Missing or empty request parameter / 缺少或为空的请求参数
    #[error("invalid request: {0}")]
    Validation(String),

    /// Target path does not exist or is not a directory / 目标路径不存在或不是目录
    #[error("not found: {0}")]
    NotFound(String),

    /// The line-search subprocess failed (other than "no matches") / 搜索子进程失败
    #[error("search tool failed: {0}")]
    ExternalTool(String),

    /// The AI completion call failed (network, non-2xx, timeout) / AI补全调用失败
    #[error("completion provider failed: {0}")]
    Provider(String),

    /// Provider output is not valid or repairable JSON / 提供方输出无法解析
    #[error("unparseable provider response: {0}")]
    Parse(String),

    /// Cache file could not be read or written / 缓存文件读写失败
    #[error("cache error: {0}")]
    Cache(String),

    /// Anything unexpected caught at the request boundary / 请求边界捕获的意外错误
    #[error("internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Stable machine-readable code for API responses / API响应用的错误码
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "invalid_request",
            SearchError::NotFound(_) => "not_found",
            SearchError::ExternalTool(_) => "external_tool_failed",
            SearchError::Provider(_) => "provider_failed",
            SearchError::Parse(_) => "parse_failed",
            SearchError::Cache(_) => "cache_error",
            SearchError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error is the caller's fault / 是否属于客户端错误
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::Validation(_) | SearchError::NotFound(_))
    }
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Provider(format!("request timed out: {}", err))
        } else {
            SearchError::Provider(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SearchError::Validation("q".into()).code(), "invalid_request");
        assert_eq!(SearchError::NotFound("p".into()).code(), "not_found");
        assert_eq!(SearchError::ExternalTool("x".into()).code(), "external_tool_failed");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(SearchError::Validation("q".into()).is_client_error());
        assert!(SearchError::NotFound("p".into()).is_client_error());
        assert!(!SearchError::ExternalTool("x".into()).is_client_error());
        assert!(!SearchError::Provider("x".into()).is_client_error());
    }
}
