//! Relevance ranking / 相关性排序
//!
//! Asks the completion provider for a ranked JSON array over the candidate
//! file set, repairs truncated output, and falls back to a deterministic
//! tiered ranking whenever the provider call or parsing fails. Provider and
//! parse failures never propagate to the caller; they are logged here.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{FileEntry, SearchResult};
use crate::provider::CompletionProvider;

/// Candidate bounds for the prompt / 提示词中的候选上限
const MAX_FILE_CANDIDATES: usize = 200;
const MAX_DIR_CANDIDATES: usize = 100;

const DEFAULT_REASONING: &str = "AI found this file relevant";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes file lists and finds \
the most relevant files based on user queries. You should respond with a JSON array of \
relevant files with their relevance scores and reasoning.";

/// Outcome of parsing a provider response / 解析提供方响应的结果
#[derive(Debug)]
pub enum ParsedRanking {
    /// Valid array with at least one resolvable entry / 含有效条目的数组
    Ok(Vec<SearchResult>),
    /// Not JSON, or not an array, even after repair / 修复后仍无法解析
    Malformed(String),
    /// Valid array but nothing usable in it / 合法数组但无可用条目
    Empty,
}

/// Relevance ranking service / 相关性排序服务
pub struct RelevanceRanker {
    provider: Arc<dyn CompletionProvider>,
}

impl RelevanceRanker {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Rank candidates for a query / 对候选文件排序
    ///
    /// Never fails: any provider or parse problem drops to the deterministic
    /// fallback. The result length never exceeds `max_results`.
    pub async fn rank(
        &self,
        query: &str,
        candidates: &[FileEntry],
        max_results: usize,
    ) -> Vec<SearchResult> {
        let prompt = build_prompt(query, candidates, max_results);

        match self.provider.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => {
                match parse_ranking(&completion.content, completion.truncated, candidates) {
                    ParsedRanking::Ok(mut results) => {
                        results.truncate(max_results);
                        tracing::info!(
                            "AI ranked {} results for \"{}\"",
                            results.len(),
                            query
                        );
                        results
                    }
                    ParsedRanking::Empty => {
                        tracing::info!("AI returned no usable results for \"{}\"", query);
                        Vec::new()
                    }
                    ParsedRanking::Malformed(reason) => {
                        tracing::warn!(
                            "AI response unusable ({}), using fallback ranking for \"{}\"",
                            reason,
                            query
                        );
                        fallback_rank(query, candidates, max_results)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Completion provider failed ({}), using fallback ranking for \"{}\"",
                    e,
                    query
                );
                fallback_rank(query, candidates, max_results)
            }
        }
    }
}

/// Build the ranking prompt / 构建排序提示词
///
/// Files are always listed ahead of directories, both bounded so the prompt
/// stays within the provider's context budget.
pub fn build_prompt(query: &str, candidates: &[FileEntry], max_results: usize) -> String {
    let file_list: Vec<Value> = candidates
        .iter()
        .filter(|f| f.is_file())
        .take(MAX_FILE_CANDIDATES)
        .map(|f| {
            serde_json::json!({
                "path": f.relative_path,
                "name": f.name,
                "type": "file",
                "extension": f.extension.clone().unwrap_or_else(|| "none".to_string()),
            })
        })
        .collect();

    let directory_list: Vec<Value> = candidates
        .iter()
        .filter(|f| f.is_directory())
        .take(MAX_DIR_CANDIDATES)
        .map(|f| {
            serde_json::json!({
                "path": f.relative_path,
                "name": f.name,
                "type": "directory",
            })
        })
        .collect();

    format!(
        r#"You are a file search expert. Find the most relevant items for the user query.

User Query: "{query}"

SEARCH PRIORITY:
1. FIRST: Look for FILES with exact word matches in filename or path
2. SECOND: Look for FILES with partial matches or related terms
3. THIRD: Look for DIRECTORIES that might contain relevant files
4. FOURTH: Look for FILES with relevant extensions

FILES ({file_count} items):
{files}

DIRECTORIES ({dir_count} items):
{dirs}

RESPONSE RULES:
- Return EXACTLY {max_results} unique items
- Prioritize FILES over directories
- No duplicates
- Score 1-10 (10 = perfect match)
- Brief reasoning for each

JSON FORMAT (return ONLY this):
[
  {{
    "path": "exact/path/from/above/list",
    "name": "exact_name",
    "type": "file",
    "relevanceScore": 9,
    "reasoning": "Exact filename match"
  }}
]"#,
        query = query,
        file_count = file_list.len(),
        files = serde_json::to_string_pretty(&file_list).unwrap_or_else(|_| "[]".to_string()),
        dir_count = directory_list.len(),
        dirs = serde_json::to_string_pretty(&directory_list).unwrap_or_else(|_| "[]".to_string()),
        max_results = max_results,
    )
}

/// Append the closers a truncated response is missing / 补齐被截断响应缺失的括号
///
/// Counts unmatched `{`/`[` against `}`/`]` and appends the difference,
/// braces before brackets, so a cut-off trailing object closes before the
/// enclosing array does.
pub fn repair_truncated_json(raw: &str) -> String {
    let open_braces = raw.matches('{').count();
    let close_braces = raw.matches('}').count();
    let open_brackets = raw.matches('[').count();
    let close_brackets = raw.matches(']').count();

    let mut fixed = raw.to_string();
    if open_braces > close_braces {
        fixed.push_str(&"}".repeat(open_braces - close_braces));
    }
    if open_brackets > close_brackets {
        fixed.push_str(&"]".repeat(open_brackets - close_brackets));
    }
    fixed
}

/// Parse and validate a provider response / 解析并校验提供方响应
///
/// Entries are de-duplicated by path, resolved back to the candidate set by
/// exact relative path or name (unresolvable entries are dropped), and
/// scores clamped to [1,10].
pub fn parse_ranking(raw: &str, truncated: bool, candidates: &[FileEntry]) -> ParsedRanking {
    let mut cleaned = raw.trim().to_string();
    if truncated {
        cleaned = repair_truncated_json(&cleaned);
        tracing::debug!("Repaired truncated response to {} bytes", cleaned.len());
    }

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => return ParsedRanking::Malformed(e.to_string()),
    };

    let items = match value.as_array() {
        Some(a) => a,
        None => return ParsedRanking::Malformed("response is not an array".to_string()),
    };
    if items.is_empty() {
        return ParsedRanking::Empty;
    }

    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut results = Vec::new();

    for item in items {
        let path = item.get("path").and_then(Value::as_str).unwrap_or_default();
        if !path.is_empty() && !seen_paths.insert(path.to_string()) {
            continue;
        }

        let name = item.get("name").and_then(Value::as_str);
        let Some(original) = candidates
            .iter()
            .find(|f| f.relative_path == path || Some(f.name.as_str()) == name)
        else {
            tracing::debug!("Dropping unresolvable ranked entry: {}", path);
            continue;
        };

        let score = item
            .get("relevanceScore")
            .and_then(Value::as_f64)
            .map(|s| s as i64)
            .unwrap_or(5)
            .clamp(1, 10) as u8;
        let reasoning = item
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REASONING)
            .to_string();

        results.push(SearchResult {
            file: original.clone(),
            relevance_score: score,
            reasoning,
        });
    }

    if results.is_empty() {
        ParsedRanking::Empty
    } else {
        ParsedRanking::Ok(results)
    }
}

/// Deterministic tiered ranking / 确定性分层排序
///
/// Pure function of (query, candidates): files score 10 down to 4 by
/// name/path containment tiers, directories 3 and 2, first matching tier
/// wins. Stable sort keeps enumeration order among equal scores; files sort
/// ahead of directories.
pub fn fallback_rank(
    query: &str,
    candidates: &[FileEntry],
    max_results: usize,
) -> Vec<SearchResult> {
    let query_lower = query.trim().to_lowercase();
    let words: Vec<&str> = query_lower.split_whitespace().collect();

    let mut file_results: Vec<SearchResult> = Vec::new();
    for file in candidates.iter().filter(|f| f.is_file()) {
        let name = file.name.to_lowercase();
        let path = file.relative_path.to_lowercase();

        let (score, reasoning) = if name == query_lower {
            (10, "Exact filename match")
        } else if name.contains(&query_lower) {
            (9, "Filename contains query")
        } else if !words.is_empty() && words.iter().all(|w| name.contains(w)) {
            (8, "Filename contains all query words")
        } else if path.contains(&query_lower) {
            (7, "Path contains query")
        } else if !words.is_empty() && words.iter().all(|w| path.contains(w)) {
            (6, "Path contains all query words")
        } else if words.iter().any(|w| name.contains(w)) {
            (5, "Filename contains query word")
        } else if words.iter().any(|w| path.contains(w)) {
            (4, "Path contains query word")
        } else {
            continue;
        };

        file_results.push(SearchResult {
            file: file.clone(),
            relevance_score: score,
            reasoning: reasoning.to_string(),
        });
    }
    file_results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

    let mut directory_results: Vec<SearchResult> = Vec::new();
    for dir in candidates.iter().filter(|f| f.is_directory()) {
        let name = dir.name.to_lowercase();
        let path = dir.relative_path.to_lowercase();

        let (score, reasoning) = if name.contains(&query_lower) {
            (3, "Directory name contains query")
        } else if path.contains(&query_lower) {
            (2, "Directory path contains query")
        } else {
            continue;
        };

        directory_results.push(SearchResult {
            file: dir.clone(),
            relevance_score: score,
            reasoning: reasoning.to_string(),
        });
    }
    directory_results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

    let mut combined = file_results;
    combined.extend(directory_results);
    combined.truncate(max_results);
    combined
}

/// Split results into file and folder partitions / 按类型拆分结果
///
/// Relative score order is preserved within each partition.
pub fn partition_results(results: &[SearchResult]) -> (Vec<SearchResult>, Vec<SearchResult>) {
    let files = results.iter().filter(|r| r.file.is_file()).cloned().collect();
    let folders = results
        .iter()
        .filter(|r| r.file.is_directory())
        .cloned()
        .collect();
    (files, folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;

    fn file(relative_path: &str, name: &str) -> FileEntry {
        let ext = crate::utils::get_ext(name);
        FileEntry {
            path: format!("/proj/{}", relative_path),
            name: name.to_string(),
            entry_type: EntryType::File,
            size: Some(100),
            extension: if ext.is_empty() { None } else { Some(ext) },
            relative_path: relative_path.to_string(),
        }
    }

    fn directory(relative_path: &str, name: &str) -> FileEntry {
        FileEntry {
            path: format!("/proj/{}", relative_path),
            name: name.to_string(),
            entry_type: EntryType::Directory,
            size: None,
            extension: None,
            relative_path: relative_path.to_string(),
        }
    }

    #[test]
    fn test_repair_counts_exactly() {
        // two complete objects, then a cut-off one missing 1 brace + the bracket
        let truncated = r#"[{"path":"a.ts","relevanceScore":9},{"path":"b.ts","relevanceScore":8},{"path":"c.ts""#;
        let repaired = repair_truncated_json(truncated);
        assert!(repaired.ends_with(r#""c.ts"}]"#));
        assert!(serde_json::from_str::<Value>(&repaired).is_ok());
    }

    #[test]
    fn test_repair_appends_multiple_braces() {
        let truncated = r#"[{"path":"a.ts","nested":{"x":1"#;
        let repaired = repair_truncated_json(truncated);
        assert_eq!(repaired, r#"[{"path":"a.ts","nested":{"x":1}}]"#);
        assert!(serde_json::from_str::<Value>(&repaired).is_ok());
    }

    #[test]
    fn test_repair_leaves_balanced_text_alone() {
        let balanced = r#"[{"path":"a.ts"}]"#;
        assert_eq!(repair_truncated_json(balanced), balanced);
    }

    #[test]
    fn test_parse_resolves_and_clamps() {
        let candidates = vec![file("src/twoSum.js", "twoSum.js")];
        let raw = r#"[{"path":"src/twoSum.js","name":"twoSum.js","relevanceScore":42,"reasoning":"match"}]"#;

        let ParsedRanking::Ok(results) = parse_ranking(raw, false, &candidates) else {
            panic!("expected parsed results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance_score, 10);
        assert_eq!(results[0].reasoning, "match");
        assert_eq!(results[0].file.relative_path, "src/twoSum.js");
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let candidates = vec![file("a.ts", "a.ts")];
        let raw = r#"[{"path":"a.ts"}]"#;

        let ParsedRanking::Ok(results) = parse_ranking(raw, false, &candidates) else {
            panic!("expected parsed results");
        };
        assert_eq!(results[0].relevance_score, 5);
        assert_eq!(results[0].reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn test_parse_deduplicates_by_path() {
        let candidates = vec![file("a.ts", "a.ts")];
        let raw = r#"[{"path":"a.ts","relevanceScore":9},{"path":"a.ts","relevanceScore":3}]"#;

        let ParsedRanking::Ok(results) = parse_ranking(raw, false, &candidates) else {
            panic!("expected parsed results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance_score, 9);
    }

    #[test]
    fn test_parse_drops_unresolvable_entries() {
        let candidates = vec![file("a.ts", "a.ts")];
        let raw = r#"[{"path":"ghost.ts","name":"ghost.ts","relevanceScore":9}]"#;

        assert!(matches!(
            parse_ranking(raw, false, &candidates),
            ParsedRanking::Empty
        ));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let candidates = vec![file("a.ts", "a.ts")];
        assert!(matches!(
            parse_ranking(r#"{"results":[]}"#, false, &candidates),
            ParsedRanking::Malformed(_)
        ));
        assert!(matches!(
            parse_ranking("not json at all", false, &candidates),
            ParsedRanking::Malformed(_)
        ));
    }

    #[test]
    fn test_parse_repairs_truncated_array() {
        let candidates = vec![file("a.ts", "a.ts"), file("b.ts", "b.ts")];
        let raw = r#"[{"path":"a.ts","relevanceScore":9},{"path":"b.ts","relevanceScore":7"#;

        let ParsedRanking::Ok(results) = parse_ranking(raw, true, &candidates) else {
            panic!("expected repaired results");
        };
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_fallback_filename_substring_beats_no_match() {
        let candidates = vec![
            file("twoSum.js", "twoSum.js"),
            file("utils/helpers.js", "helpers.js"),
        ];
        let results = fallback_rank("twoSum", &candidates, 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file.name, "twoSum.js");
        assert_eq!(results[0].relevance_score, 9);
    }

    #[test]
    fn test_fallback_tier_order() {
        let candidates = vec![
            file("notes/other.md", "other.md"),
            file("search.rs", "search.rs"),
            file("src/search/mod.rs", "mod.rs"),
        ];
        let results = fallback_rank("search", &candidates, 10);

        assert_eq!(results.len(), 2);
        // exact filename-contains beats path-contains
        assert_eq!(results[0].file.name, "search.rs");
        assert_eq!(results[0].relevance_score, 9);
        assert_eq!(results[1].file.name, "mod.rs");
        assert_eq!(results[1].relevance_score, 7);
    }

    #[test]
    fn test_fallback_exact_name_scores_ten() {
        let candidates = vec![file("config.json", "config.json")];
        let results = fallback_rank("config.json", &candidates, 10);
        assert_eq!(results[0].relevance_score, 10);
    }

    #[test]
    fn test_fallback_directory_tiers() {
        let candidates = vec![
            directory("search", "search"),
            directory("search/nested", "nested"),
            file("search/engine.rs", "engine.rs"),
        ];
        let results = fallback_rank("search", &candidates, 10);

        // file tier first, then directory name tier, then directory path tier
        assert_eq!(results[0].file.name, "engine.rs");
        assert_eq!(results[1].file.name, "search");
        assert_eq!(results[1].relevance_score, 3);
        assert_eq!(results[2].file.name, "nested");
        assert_eq!(results[2].relevance_score, 2);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let candidates = vec![
            file("alpha/search.rs", "search.rs"),
            file("beta/search.rs", "search.rs"),
            directory("search", "search"),
        ];

        let first = fallback_rank("search", &candidates, 10);
        let second = fallback_rank("search", &candidates, 10);

        let as_pairs = |results: &[SearchResult]| {
            results
                .iter()
                .map(|r| (r.file.relative_path.clone(), r.relevance_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(as_pairs(&first), as_pairs(&second));
        // stable among equal scores: enumeration order preserved
        assert_eq!(first[0].file.relative_path, "alpha/search.rs");
        assert_eq!(first[1].file.relative_path, "beta/search.rs");
    }

    #[test]
    fn test_fallback_respects_max_results() {
        let candidates: Vec<FileEntry> = (0..50)
            .map(|i| file(&format!("search_{}.rs", i), &format!("search_{}.rs", i)))
            .collect();
        let results = fallback_rank("search", &candidates, 10);
        assert_eq!(results.len(), 10);
    }

    #[test]
    fn test_partition_preserves_order() {
        let results = vec![
            SearchResult {
                file: file("a.rs", "a.rs"),
                relevance_score: 9,
                reasoning: "r".to_string(),
            },
            SearchResult {
                file: directory("dir", "dir"),
                relevance_score: 3,
                reasoning: "r".to_string(),
            },
            SearchResult {
                file: file("b.rs", "b.rs"),
                relevance_score: 7,
                reasoning: "r".to_string(),
            },
        ];

        let (files, folders) = partition_results(&results);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file.name, "a.rs");
        assert_eq!(files[1].file.name, "b.rs");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].file.name, "dir");
    }

    /// Provider stub with a canned reply / 返回预置内容的测试桩
    struct StubProvider {
        reply: Result<crate::provider::Completion, ()>,
    }

    #[async_trait::async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> Result<crate::provider::Completion, crate::error::SearchError> {
            match &self.reply {
                Ok(completion) => Ok(completion.clone()),
                Err(()) => Err(crate::error::SearchError::Provider("stub failure".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_rank_uses_fallback_on_provider_failure() {
        let ranker = RelevanceRanker::new(Arc::new(StubProvider { reply: Err(()) }));
        let candidates = vec![file("twoSum.js", "twoSum.js"), file("utils/helpers.js", "helpers.js")];

        let results = ranker.rank("twoSum", &candidates, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file.name, "twoSum.js");
        assert_eq!(results[0].relevance_score, 9);
    }

    #[tokio::test]
    async fn test_rank_repairs_truncated_provider_output() {
        let truncated = r#"[{"path":"a.ts","relevanceScore":9},{"path":"b.ts","relevanceScore":7"#;
        let ranker = RelevanceRanker::new(Arc::new(StubProvider {
            reply: Ok(crate::provider::Completion {
                content: truncated.to_string(),
                truncated: true,
            }),
        }));
        let candidates = vec![file("a.ts", "a.ts"), file("b.ts", "b.ts")];

        let results = ranker.rank("anything", &candidates, 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file.name, "a.ts");
        assert_eq!(results[0].relevance_score, 9);
    }

    #[tokio::test]
    async fn test_rank_never_exceeds_max_results() {
        let reply: Vec<Value> = (0..20)
            .map(|i| {
                serde_json::json!({
                    "path": format!("f{}.rs", i),
                    "relevanceScore": 8,
                })
            })
            .collect();
        let ranker = RelevanceRanker::new(Arc::new(StubProvider {
            reply: Ok(crate::provider::Completion {
                content: serde_json::to_string(&reply).unwrap(),
                truncated: false,
            }),
        }));
        let candidates: Vec<FileEntry> = (0..20)
            .map(|i| file(&format!("f{}.rs", i), &format!("f{}.rs", i)))
            .collect();

        let results = ranker.rank("query", &candidates, 5).await;
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_rank_falls_back_on_non_array_reply() {
        let ranker = RelevanceRanker::new(Arc::new(StubProvider {
            reply: Ok(crate::provider::Completion {
                content: r#"{"message":"I could not find anything"}"#.to_string(),
                truncated: false,
            }),
        }));
        let candidates = vec![file("search.rs", "search.rs")];

        let results = ranker.rank("search", &candidates, 10).await;
        // fallback tiers kick in: filename contains query
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance_score, 9);
    }

    #[test]
    fn test_prompt_bounds_candidates() {
        let mut candidates: Vec<FileEntry> = (0..300)
            .map(|i| file(&format!("f{}.rs", i), &format!("f{}.rs", i)))
            .collect();
        for i in 0..150 {
            candidates.push(directory(&format!("d{}", i), &format!("d{}", i)));
        }

        let prompt = build_prompt("query", &candidates, 10);
        assert!(prompt.contains("FILES (200 items)"));
        assert!(prompt.contains("DIRECTORIES (100 items)"));
        assert!(prompt.contains("Return EXACTLY 10 unique items"));
    }
}
