//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Cache configuration / 缓存配置
    pub cache: CacheConfig,
    /// Directory indexer configuration / 目录索引配置
    pub indexer: IndexerConfig,
    /// Content search configuration / 内容搜索配置
    pub content_search: ContentSearchConfig,
    /// AI completion provider configuration / AI补全提供方配置
    pub provider: ProviderConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Cache configuration / 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory path / 缓存目录路径
    pub cache_dir: String,
    /// Directory index TTL in seconds / 目录索引缓存有效期（秒）
    pub index_ttl_secs: u64,
    /// Ranked search result TTL in seconds / 搜索结果缓存有效期（秒）
    pub search_ttl_secs: u64,
}

/// Directory indexer configuration / 目录索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Default folder when the request names none / 请求未指定时的默认目录
    pub default_folder: String,
    /// Names pruned at traversal time / 遍历时剪枝的名称
    pub exclude_names: Vec<String>,
    /// Ceiling on enumerated entries / 枚举条目上限
    pub max_entries: usize,
    /// Maximum recursion depth / 最大递归深度
    pub max_depth: usize,
}

/// Content search configuration / 内容搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSearchConfig {
    /// Timeout for the line-search subprocess in seconds / 子进程超时（秒）
    pub tool_timeout_secs: u64,
    /// Context lines fetched around a match / 匹配上下文行数
    pub context_lines: usize,
    /// Matches that receive context enrichment / 附加上下文的匹配数上限
    pub context_limit: usize,
    /// Default cap on returned matches / 返回匹配数的默认上限
    pub default_max_results: usize,
}

/// AI completion provider configuration / AI补全提供方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chat completions endpoint / 补全接口地址
    pub base_url: String,
    /// Model identifier / 模型标识
    pub model: String,
    /// Environment variable holding the API key / 存放API密钥的环境变量
    pub api_key_env: String,
    /// Completion token budget / 补全token预算
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8190,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: ".cache".to_string(),
            index_ttl_secs: 5 * 60,
            search_ttl_secs: 30 * 60,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            default_folder: ".".to_string(),
            exclude_names: [
                "node_modules",
                ".git",
                ".next",
                "build",
                "dist",
                ".DS_Store",
                "*.log",
                ".cache",
                "coverage",
                "__pycache__",
                "*.pyc",
                ".env",
                ".tmp",
                ".temp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_entries: 1000,
            max_depth: 10,
        }
    }
}

impl Default for ContentSearchConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            context_lines: 2,
            context_limit: 20,
            default_max_results: 100,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "mistralai/ministral-8b".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            max_tokens: 2000,
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the cache directory path / 获取缓存目录路径
    pub fn get_cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.cache_dir)
    }

    /// Get the folder index cache file path / 获取目录索引缓存文件路径
    pub fn get_index_cache_path(&self) -> PathBuf {
        self.get_cache_dir().join("folder-cache.json")
    }

    /// Get the search result cache file path / 获取搜索结果缓存文件路径
    pub fn get_search_cache_path(&self) -> PathBuf {
        self.get_cache_dir().join("search-cache.json")
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.index_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.search_ttl_secs)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG
        .set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG
        .get_or_init(|| {
            let config = load_config().unwrap_or_default();
            Arc::new(RwLock::new(config))
        })
        .clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}
