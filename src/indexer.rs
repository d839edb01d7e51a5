//! Directory indexer / 目录索引器
//!
//! Recursively lists a root directory into FileEntry records, pruning the
//! configured exclusion set at traversal time so excluded subtrees are never
//! descended into. Listings are cached per canonical root with a TTL; a
//! forced refresh deletes the cached entry and recomputes unconditionally.

use std::path::Path;

use crate::cache::JsonCache;
use crate::config::IndexerConfig;
use crate::error::SearchError;
use crate::models::{EntryType, FileEntry};
use crate::utils::{get_ext, is_excluded_name, relative_path_of};

/// Result of one index request / 单次索引请求的结果
#[derive(Debug)]
pub struct IndexOutcome {
    pub files: Vec<FileEntry>,
    pub cached: bool,
    pub cache_timestamp: i64,
}

/// Directory indexing service / 目录索引服务
pub struct DirectoryIndexer {
    exclude_names: Vec<String>,
    max_entries: usize,
    max_depth: usize,
    cache: JsonCache<Vec<FileEntry>>,
}

impl DirectoryIndexer {
    pub fn new(cfg: &IndexerConfig, cache: JsonCache<Vec<FileEntry>>) -> Self {
        Self {
            exclude_names: cfg.exclude_names.clone(),
            max_entries: cfg.max_entries,
            max_depth: cfg.max_depth,
            cache,
        }
    }

    /// List a root directory, served from cache within TTL / 列出根目录
    pub fn index(&self, folder: &str, force_refresh: bool) -> Result<IndexOutcome, SearchError> {
        let root = Path::new(folder);
        if !root.exists() {
            return Err(SearchError::NotFound(format!(
                "folder does not exist: {}",
                folder
            )));
        }
        if !root.is_dir() {
            return Err(SearchError::NotFound(format!(
                "path is not a directory: {}",
                folder
            )));
        }

        // Cache key is the canonicalized root / 缓存键为规范化后的根路径
        let canonical = std::fs::canonicalize(root)
            .map_err(|e| SearchError::NotFound(format!("cannot resolve {}: {}", folder, e)))?;
        let key = canonical.to_string_lossy().to_string();

        if force_refresh {
            tracing::debug!("Force refresh requested for {}", key);
            self.cache.remove(&key);
        } else if let Some(entry) = self.cache.get(&key) {
            tracing::debug!("Using cached listing for {}", key);
            return Ok(IndexOutcome {
                files: entry.data,
                cached: true,
                cache_timestamp: entry.timestamp,
            });
        }

        let mut files = Vec::new();
        self.scan_directory(&canonical, &canonical, 0, &mut files);

        // Directories first, then files, alphabetical within each group.
        // Byte-wise name compare keeps the order locale-independent.
        files.sort_by(|a, b| match (a.entry_type, b.entry_type) {
            (EntryType::Directory, EntryType::File) => std::cmp::Ordering::Less,
            (EntryType::File, EntryType::Directory) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });

        tracing::info!("Indexed {} entries under {}", files.len(), key);

        let timestamp = self.cache.put(&key, files.clone());
        Ok(IndexOutcome {
            files,
            cached: false,
            cache_timestamp: timestamp,
        })
    }

    fn scan_directory(&self, dir: &Path, base: &Path, depth: usize, out: &mut Vec<FileEntry>) {
        if depth >= self.max_depth || out.len() >= self.max_entries {
            return;
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            if out.len() >= self.max_entries {
                tracing::debug!(
                    "Entry ceiling of {} reached under {}",
                    self.max_entries,
                    base.display()
                );
                return;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if is_excluded_name(&name, &self.exclude_names) {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Skipping inaccessible item {}: {}", path.display(), e);
                    continue;
                }
            };

            let relative_path = relative_path_of(base, &path);

            if metadata.is_dir() {
                out.push(FileEntry {
                    path: path.to_string_lossy().to_string(),
                    name,
                    entry_type: EntryType::Directory,
                    size: None,
                    extension: None,
                    relative_path,
                });
                self.scan_directory(&path, base, depth + 1, out);
            } else if metadata.is_file() {
                let ext = get_ext(&name);
                out.push(FileEntry {
                    path: path.to_string_lossy().to_string(),
                    name,
                    entry_type: EntryType::File,
                    size: Some(metadata.len()),
                    extension: if ext.is_empty() { None } else { Some(ext) },
                    relative_path,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn indexer_for(dir: &TempDir, ttl: Duration) -> DirectoryIndexer {
        let cfg = IndexerConfig::default();
        let cache = JsonCache::open(dir.path().join("folder-cache.json"), ttl);
        DirectoryIndexer::new(&cfg, cache)
    }

    fn write_file(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_excluded_directory_never_descended() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "a.ts", "export const a = 1;");
        write_file(root.path(), "node_modules/b.ts", "export const b = 2;");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let outcome = indexer
            .index(root.path().to_str().unwrap(), false)
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].name, "a.ts");
        assert!(outcome
            .files
            .iter()
            .all(|f| !f.relative_path.contains("node_modules")));
    }

    #[test]
    fn test_directories_sort_before_files() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "zeta.rs", "");
        write_file(root.path(), "alpha/inner.rs", "");
        write_file(root.path(), "beta/inner.rs", "");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let outcome = indexer
            .index(root.path().to_str().unwrap(), false)
            .unwrap();

        let names: Vec<&str> = outcome.files.iter().map(|f| f.name.as_str()).collect();
        // both directories come first, alphabetically, files after
        assert_eq!(names[0], "alpha");
        assert_eq!(names[1], "beta");
        assert!(names[2..].contains(&"zeta.rs"));
    }

    #[test]
    fn test_entry_fields() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "src/main.RS", "fn main() {}");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let outcome = indexer
            .index(root.path().to_str().unwrap(), false)
            .unwrap();

        let dir = outcome.files.iter().find(|f| f.name == "src").unwrap();
        assert!(dir.is_directory());
        assert!(dir.size.is_none());
        assert!(dir.extension.is_none());

        let file = outcome.files.iter().find(|f| f.name == "main.RS").unwrap();
        assert!(file.is_file());
        assert_eq!(file.extension.as_deref(), Some("rs"));
        assert_eq!(file.relative_path, "src/main.RS");
        assert!(!file.relative_path.starts_with('/'));
        assert_eq!(file.size, Some("fn main() {}".len() as u64));
    }

    #[test]
    fn test_second_index_within_ttl_is_cached() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "a.txt", "a");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let folder = root.path().to_str().unwrap().to_string();

        let first = indexer.index(&folder, false).unwrap();
        assert!(!first.cached);

        let second = indexer.index(&folder, false).unwrap();
        assert!(second.cached);
        assert_eq!(second.cache_timestamp, first.cache_timestamp);

        let first_paths: Vec<&String> = first.files.iter().map(|f| &f.relative_path).collect();
        let second_paths: Vec<&String> = second.files.iter().map(|f| &f.relative_path).collect();
        assert_eq!(first_paths, second_paths);
    }

    #[test]
    fn test_force_refresh_recomputes() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "a.txt", "a");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let folder = root.path().to_str().unwrap().to_string();

        indexer.index(&folder, false).unwrap();
        write_file(root.path(), "b.txt", "b");

        // still served from cache without refresh
        let stale = indexer.index(&folder, false).unwrap();
        assert_eq!(stale.files.len(), 1);

        let fresh = indexer.index(&folder, true).unwrap();
        assert!(!fresh.cached);
        assert_eq!(fresh.files.len(), 2);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let cache_dir = TempDir::new().unwrap();
        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));

        let err = indexer.index("/definitely/not/a/real/path", false).unwrap_err();
        assert!(matches!(err, SearchError::NotFound(_)));
    }

    #[test]
    fn test_file_root_is_not_found() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        write_file(root.path(), "plain.txt", "x");

        let indexer = indexer_for(&cache_dir, Duration::from_secs(60));
        let file_path = root.path().join("plain.txt");
        let err = indexer
            .index(file_path.to_str().unwrap(), false)
            .unwrap_err();
        assert!(matches!(err, SearchError::NotFound(_)));
    }

    #[test]
    fn test_entry_ceiling_bounds_listing() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        for i in 0..20 {
            write_file(root.path(), &format!("f{:02}.txt", i), "x");
        }

        let cfg = IndexerConfig {
            max_entries: 5,
            ..IndexerConfig::default()
        };
        let cache = JsonCache::open(cache_dir.path().join("folder-cache.json"), Duration::from_secs(60));
        let indexer = DirectoryIndexer::new(&cfg, cache);

        let outcome = indexer
            .index(root.path().to_str().unwrap(), false)
            .unwrap();
        assert_eq!(outcome.files.len(), 5);
    }
}
