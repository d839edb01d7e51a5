//! TTL-bounded, file-backed key/value caches / 带TTL的文件持久化缓存
//!
//! Each cache is one JSON document on disk mapping cache key to entry.
//! Expired entries are evicted lazily before lookups and never read back.
//! The load-modify-persist cycle for one cache instance is serialized
//! behind a mutex; the two caches (index, search) are independent files.

use chrono::Utc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::FileEntry;

/// One cached value with its creation time / 一条缓存记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Milliseconds since epoch / 毫秒时间戳
    pub timestamp: i64,
    pub key: String,
}

/// File-backed cache service / 文件持久化缓存服务
pub struct JsonCache<T> {
    path: PathBuf,
    ttl_ms: i64,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone + Serialize + DeserializeOwned> JsonCache<T> {
    /// Open a cache, loading still-valid entries from disk / 打开缓存并加载未过期的记录
    pub fn open(path: PathBuf, ttl: Duration) -> Self {
        let ttl_ms = ttl.as_millis() as i64;
        let entries = load_entries(&path, ttl_ms);
        Self {
            path,
            ttl_ms,
            entries: Mutex::new(entries),
        }
    }

    /// Look up a key, evicting anything expired first / 查找前先清理过期记录
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let mut entries = self.entries.lock();
        self.evict_expired_locked(&mut entries);
        entries.get(key).cloned()
    }

    /// Insert a value and persist; returns the entry timestamp / 写入并持久化
    pub fn put(&self, key: &str, data: T) -> i64 {
        let timestamp = Utc::now().timestamp_millis();
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp,
                key: key.to_string(),
            },
        );
        self.persist_locked(&entries);
        timestamp
    }

    /// Delete a key regardless of TTL state / 无视TTL直接删除
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.remove(key).is_some();
        if removed {
            self.persist_locked(&entries);
        }
        removed
    }

    /// Drop expired entries, persisting if anything changed / 清理过期记录
    pub fn evict_expired(&self) {
        let mut entries = self.entries.lock();
        self.evict_expired_locked(&mut entries);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn evict_expired_locked(&self, entries: &mut HashMap<String, CacheEntry<T>>) {
        let now = Utc::now().timestamp_millis();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.timestamp <= self.ttl_ms);
        let cleaned = before - entries.len();
        if cleaned > 0 {
            tracing::debug!("Cleaned {} expired cache entries from {:?}", cleaned, self.path);
            self.persist_locked(entries);
        }
    }

    fn persist_locked(&self, entries: &HashMap<String, CacheEntry<T>>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!("Failed to create cache directory {:?}: {}", parent, e);
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(entries) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&self.path, content) {
                    tracing::warn!("Failed to save cache file {:?}: {}", self.path, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize cache {:?}: {}", self.path, e),
        }
    }
}

/// Read a cache document, skipping expired entries / 读取缓存文件并跳过过期记录
fn load_entries<T: DeserializeOwned>(path: &PathBuf, ttl_ms: i64) -> HashMap<String, CacheEntry<T>> {
    if !path.exists() {
        tracing::debug!("No cache file at {:?}, starting with empty cache", path);
        return HashMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read cache file {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let parsed: HashMap<String, CacheEntry<T>> = match serde_json::from_str(&content) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Failed to parse cache file {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let now = Utc::now().timestamp_millis();
    let total = parsed.len();
    let entries: HashMap<String, CacheEntry<T>> = parsed
        .into_iter()
        .filter(|(_, entry)| now - entry.timestamp <= ttl_ms)
        .collect();

    tracing::info!(
        "Loaded {} cache entries from {:?} ({} expired entries skipped)",
        entries.len(),
        path,
        total - entries.len()
    );
    entries
}

/// Hash the candidate file set, insensitive to enumeration order / 计算文件集哈希
///
/// The canonical form sorts entries by relative path, so reordering the
/// same files yields the same hash while adding or removing any file
/// changes it.
pub fn file_set_hash(files: &[FileEntry]) -> String {
    let mut lines: Vec<String> = files
        .iter()
        .map(|f| {
            format!(
                "{}|{}|{}|{}",
                f.relative_path,
                f.name,
                f.entry_type.as_str(),
                f.size.unwrap_or(0)
            )
        })
        .collect();
    lines.sort();
    let digest = format!("{:x}", md5::compute(lines.join("\n").as_bytes()));
    digest[..16].to_string()
}

/// Derive the search cache key from query and file set / 推导搜索缓存键
pub fn search_cache_key(query: &str, file_hash: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let query_hash = format!("{:x}", md5::compute(normalized.as_bytes()));
    format!("{}_{}", &query_hash[..8], file_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;
    use tempfile::TempDir;

    fn entry(relative_path: &str, name: &str, entry_type: EntryType, size: Option<u64>) -> FileEntry {
        FileEntry {
            path: format!("/proj/{}", relative_path),
            name: name.to_string(),
            entry_type,
            size,
            extension: None,
            relative_path: relative_path.to_string(),
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache: JsonCache<Vec<String>> =
            JsonCache::open(dir.path().join("cache.json"), Duration::from_secs(60));

        cache.put("k1", vec!["a".to_string(), "b".to_string()]);
        let entry = cache.get("k1").expect("entry should be cached");
        assert_eq!(entry.data, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(entry.key, "k1");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_persisted_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let cache: JsonCache<String> = JsonCache::open(path.clone(), Duration::from_secs(60));
        cache.put("k1", "value".to_string());

        let reopened: JsonCache<String> = JsonCache::open(path, Duration::from_secs(60));
        assert_eq!(reopened.get("k1").unwrap().data, "value");
    }

    #[test]
    fn test_expired_entries_never_read() {
        let dir = TempDir::new().unwrap();
        let cache: JsonCache<String> =
            JsonCache::open(dir.path().join("cache.json"), Duration::from_secs(0));

        cache.put("k1", "value".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let cache: JsonCache<String> =
            JsonCache::open(dir.path().join("cache.json"), Duration::from_secs(60));

        cache.put("k1", "value".to_string());
        assert!(cache.remove("k1"));
        assert!(!cache.remove("k1"));
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn test_file_set_hash_order_insensitive() {
        let a = entry("src/binary.rs", "binary.rs", EntryType::File, Some(10));
        let b = entry("src/search.rs", "search.rs", EntryType::File, Some(20));

        let forward = file_set_hash(&[a.clone(), b.clone()]);
        let reversed = file_set_hash(&[b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_file_set_hash_sensitive_to_contents() {
        let a = entry("a.ts", "a.ts", EntryType::File, Some(1));
        let b = entry("b.ts", "b.ts", EntryType::File, Some(1));

        assert_ne!(file_set_hash(&[a.clone()]), file_set_hash(&[a, b]));
    }

    #[test]
    fn test_search_cache_key_stable() {
        let files = vec![
            entry("x.js", "x.js", EntryType::File, Some(1)),
            entry("y.js", "y.js", EntryType::File, Some(2)),
        ];
        let shuffled = vec![files[1].clone(), files[0].clone()];

        let k1 = search_cache_key("binary search", &file_set_hash(&files));
        let k2 = search_cache_key("binary search", &file_set_hash(&shuffled));
        assert_eq!(k1, k2);

        // query hash is 8 hex chars, file hash 16 / 查询哈希8位，文件哈希16位
        let parts: Vec<&str> = k1.split('_').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 16);
    }

    #[test]
    fn test_search_cache_key_normalizes_query() {
        let hash = "0123456789abcdef";
        assert_eq!(
            search_cache_key("  Binary Search ", hash),
            search_cache_key("binary search", hash)
        );
    }
}
