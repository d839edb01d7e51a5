//! Line-level content search / 行级内容搜索
//!
//! Drives an external recursive line-search tool over a root directory and
//! parses its `path:line:content` output. The concrete tool sits behind the
//! `TextSearchProvider` trait so it can be swapped without touching the
//! parsing logic. "No matches" is an empty result, not an error.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncBufReadExt;
use tokio::process::Command;

use crate::error::SearchError;
use crate::fuzzy::{sanitize_query, FuzzyOptions, FuzzyPatternCompiler};
use crate::models::ContentMatch;
use crate::utils::{get_ext, relative_path_of};

/// File-type globs searched when the request names none / 默认搜索的文件类型
pub static DEFAULT_INCLUDE_TYPES: &[&str] = &[
    "*.js", "*.jsx", "*.ts", "*.tsx", "*.py", "*.java", "*.cpp", "*.c", "*.h", "*.cs", "*.go",
    "*.rs", "*.php", "*.rb", "*.swift", "*.kt", "*.scala", "*.html", "*.css", "*.scss", "*.sass",
    "*.less", "*.vue", "*.svelte", "*.json", "*.xml", "*.yaml", "*.yml", "*.toml", "*.ini",
    "*.cfg", "*.conf", "*.md", "*.txt", "*.sql", "*.sh", "*.bash", "*.zsh", "*.fish", "*.ps1",
    "*.bat", "*.cmd",
];

/// Directories skipped when the request names none / 默认排除的目录
pub static DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    ".cache",
    "coverage",
    ".nyc_output",
    "logs",
    ".vscode",
    ".idea",
];

/// Filters handed to the search tool / 传给搜索工具的过滤条件
#[derive(Debug, Clone)]
pub struct SearchFilters {
    pub file_types: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub case_sensitive: bool,
    pub max_results: usize,
}

/// Raw tool output plus the command used / 工具原始输出及执行的命令
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub command: String,
}

/// Seam for the concrete line-search tool / 行搜索工具的抽象接口
#[async_trait]
pub trait TextSearchProvider: Send + Sync {
    async fn search(
        &self,
        pattern: &str,
        root: &Path,
        filters: &SearchFilters,
    ) -> Result<ToolOutput, SearchError>;
}

/// grep-based provider / 基于grep的实现
pub struct GrepSearchProvider {
    timeout: Duration,
}

impl GrepSearchProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build_flags(case_sensitive: bool) -> String {
        // recursive + line numbers, extended regex; case-insensitive unless asked
        let mut flags = String::from("-rn");
        if !case_sensitive {
            flags.push('i');
        }
        flags.push('E');
        flags
    }

    fn render_command(flags: &str, pattern: &str, root: &Path, filters: &SearchFilters) -> String {
        let mut command = format!("grep {} \"{}\" \"{}\"", flags, pattern, root.display());
        for t in &filters.file_types {
            command.push_str(&format!(" --include=\"{}\"", t));
        }
        for d in &filters.exclude_dirs {
            command.push_str(&format!(" --exclude-dir=\"{}\"", d));
        }
        command
    }
}

#[async_trait]
impl TextSearchProvider for GrepSearchProvider {
    async fn search(
        &self,
        pattern: &str,
        root: &Path,
        filters: &SearchFilters,
    ) -> Result<ToolOutput, SearchError> {
        let flags = Self::build_flags(filters.case_sensitive);
        let command = Self::render_command(&flags, pattern, root, filters);
        tracing::debug!("Executing: {}", command);

        let mut cmd = Command::new("grep");
        cmd.arg(&flags).arg(pattern).arg(root);
        for t in &filters.file_types {
            cmd.arg(format!("--include={}", t));
        }
        for d in &filters.exclude_dirs {
            cmd.arg(format!("--exclude-dir={}", d));
        }
        cmd.stdin(Stdio::null());

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                SearchError::ExternalTool(format!(
                    "grep timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| SearchError::ExternalTool(format!("failed to run grep: {}", e)))?;

        // Exit code 1 means "no lines matched" and is not a failure.
        match output.status.code() {
            Some(0) | Some(1) => Ok(ToolOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                command,
            }),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(SearchError::ExternalTool(format!(
                    "grep exited with {:?}: {}",
                    code,
                    stderr.trim()
                )))
            }
        }
    }
}

/// Parse `path:line:content` output lines / 解析工具输出
///
/// Only the first two colons delimit fields; the content itself may contain
/// colons and is never re-split. Unparseable lines are skipped.
pub fn parse_matches(stdout: &str, base: &Path) -> Vec<ContentMatch> {
    let mut results = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let Some(first) = line.find(':') else { continue };
        let Some(rest) = line[first + 1..].find(':') else {
            continue;
        };
        let second = first + 1 + rest;

        let file_path = &line[..first];
        let line_number: u32 = match line[first + 1..second].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let content = &line[second + 1..];

        let file_name = Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());
        let ext = get_ext(&file_name);

        results.push(ContentMatch {
            file: file_path.to_string(),
            line_number,
            content: content.trim().to_string(),
            relative_path: relative_path_of(base, Path::new(file_path)),
            file_name,
            file_extension: if ext.is_empty() { None } else { Some(ext) },
            context_before: None,
            context_after: None,
        });
    }

    results
}

/// Read the lines surrounding a match / 读取匹配行周围的上下文
pub async fn read_context(
    path: &str,
    line_number: usize,
    window: usize,
) -> (Option<String>, Option<String>) {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return (None, None),
    };

    let start = line_number.saturating_sub(window);
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut current = 0usize;

    let mut lines = tokio::io::BufReader::new(file).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        current += 1;
        if current >= start && current < line_number {
            before.push(line);
        } else if current > line_number && current <= line_number + window {
            after.push(line);
        }
        if current > line_number + window {
            break;
        }
    }

    let collapse = |parts: Vec<String>| {
        let joined = parts.join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };
    (collapse(before), collapse(after))
}

/// Options for one content search / 单次内容搜索的选项
#[derive(Debug, Clone)]
pub struct ContentSearchOptions {
    pub file_types: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub case_sensitive: bool,
    pub max_results: usize,
    pub enable_fuzzy: bool,
    pub enable_flexible_spacing: bool,
    pub fuzzy: FuzzyOptions,
}

impl Default for ContentSearchOptions {
    fn default() -> Self {
        Self {
            file_types: Vec::new(),
            exclude_dirs: Vec::new(),
            case_sensitive: false,
            max_results: 100,
            enable_fuzzy: false,
            enable_flexible_spacing: false,
            fuzzy: FuzzyOptions::default(),
        }
    }
}

/// Result of one content search / 单次内容搜索的结果
#[derive(Debug)]
pub struct ContentSearchOutcome {
    pub matches: Vec<ContentMatch>,
    pub total_matches: usize,
    pub elapsed_ms: u64,
    pub command: String,
}

/// Content search orchestration / 内容搜索编排
pub struct ContentSearcher {
    provider: Arc<dyn TextSearchProvider>,
    compiler: FuzzyPatternCompiler,
    context_limit: usize,
    context_lines: usize,
}

impl ContentSearcher {
    pub fn new(
        provider: Arc<dyn TextSearchProvider>,
        context_limit: usize,
        context_lines: usize,
    ) -> Self {
        Self {
            provider,
            compiler: FuzzyPatternCompiler::new(),
            context_limit,
            context_lines,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        folder: &str,
        options: &ContentSearchOptions,
    ) -> Result<ContentSearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("query is required".to_string()));
        }

        // Clients occasionally send percent-encoded folder paths / 兼容URL编码的路径
        let decoded = urlencoding::decode(folder)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| folder.to_string());
        let folder = decoded.trim();
        let root = PathBuf::from(folder);
        if folder.is_empty() || !root.is_dir() {
            return Err(SearchError::NotFound(format!(
                "folder does not exist: {}",
                folder
            )));
        }

        let pattern = if options.enable_fuzzy || options.enable_flexible_spacing {
            self.compiler.compile(
                query,
                options.enable_fuzzy,
                options.enable_flexible_spacing,
                &options.fuzzy,
            )
        } else {
            sanitize_query(query.trim())
        };

        // Custom substitutions can produce garbage; reject anything the regex
        // engine cannot parse before spawning the tool.
        if let Err(e) = Regex::new(&pattern) {
            return Err(SearchError::Validation(format!(
                "unusable search pattern: {}",
                e
            )));
        }

        let filters = SearchFilters {
            file_types: if options.file_types.is_empty() {
                DEFAULT_INCLUDE_TYPES.iter().map(|s| s.to_string()).collect()
            } else {
                options.file_types.clone()
            },
            exclude_dirs: if options.exclude_dirs.is_empty() {
                DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
            } else {
                options.exclude_dirs.clone()
            },
            case_sensitive: options.case_sensitive,
            max_results: options.max_results,
        };

        let start = Instant::now();
        let output = self.provider.search(&pattern, &root, &filters).await?;

        let mut matches = parse_matches(&output.stdout, &root);
        if matches.len() > filters.max_results {
            matches.truncate(filters.max_results);
        }
        let total_matches = matches.len();

        // Context enrichment is bounded to the leading matches / 仅前若干条附加上下文
        let enriched = self.context_limit.min(matches.len());
        let context_futures = matches[..enriched]
            .iter()
            .map(|m| read_context(&m.file, m.line_number as usize, self.context_lines));
        let contexts = futures::future::join_all(context_futures).await;
        for (m, (before, after)) in matches.iter_mut().zip(contexts) {
            m.context_before = before;
            m.context_after = after;
        }

        tracing::info!(
            "Content search for \"{}\" found {} matches in {}ms",
            query,
            total_matches,
            start.elapsed().as_millis()
        );

        Ok(ContentSearchOutcome {
            matches,
            total_matches,
            elapsed_ms: start.elapsed().as_millis() as u64,
            command: output.command,
        })
    }
}
