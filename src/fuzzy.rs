//! Fuzzy pattern compiler / 模糊模式编译器
//!
//! Expands a query into an extended-regex alternation tolerant of common
//! misspellings: character substitutions from a similarity table, single
//! deletions, doubled letters, adjacent transpositions, affix stripping and
//! phonetic digraph rewrites. The generator is heuristic, not edit-distance
//! bounded; words at or below the length threshold pass through unchanged to
//! avoid combinatorial blowup on short tokens.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Words must be longer than this to be fuzzed / 超过该长度的词才参与模糊
pub const MIN_FUZZY_LEN: usize = 3;

/// Words must be longer than this for affix stripping / 超过该长度才做词缀剥离
const MIN_AFFIX_LEN: usize = 5;

/// Character similarity table (visual and phonetic confusions) / 字符相似表
static SUBSTITUTIONS: Lazy<HashMap<char, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert('a', vec!["e", "i", "@"]);
    m.insert('e', vec!["a", "i", "3"]);
    m.insert('i', vec!["e", "a", "1", "l"]);
    m.insert('o', vec!["u", "0"]);
    m.insert('u', vec!["o"]);
    m.insert('s', vec!["z", "$", "5"]);
    m.insert('z', vec!["s"]);
    m.insert('c', vec!["k", "ck"]);
    m.insert('k', vec!["c", "ck"]);
    m.insert('f', vec!["ph", "v"]);
    m.insert('v', vec!["f"]);
    m.insert('y', vec!["i"]);
    m.insert('w', vec!["wh", "u"]);
    m.insert('x', vec!["ks", "cs"]);
    m.insert('q', vec!["k", "c"]);
    m
});

/// Phonetic digraph rewrites applied to the whole word / 整词语音改写规则
static PHONETIC_RULES: &[(&str, &str)] = &[
    ("ph", "f"),
    ("ck", "k"),
    ("qu", "kw"),
    ("x", "ks"),
    ("ght", "te"),
    ("ough", "uf"),
    ("augh", "af"),
    ("eigh", "a"),
    ("tion", "shun"),
    ("sion", "shun"),
    ("cious", "shus"),
    ("tious", "shus"),
];

/// Consonants that are commonly doubled / 常见的双写辅音
static DOUBLE_LETTERS: &[char] = &['l', 'r', 'n', 'm', 's', 't', 'p', 'f', 'c'];

static PREFIXES: &[&str] = &["un", "pre", "dis", "mis", "over", "under", "out"];
static SUFFIXES: &[&str] = &["ing", "ed", "er", "est", "ly", "tion", "sion", "ment"];

fn default_true() -> bool {
    true
}

/// Fuzzy generation options / 模糊生成选项
///
/// `max_distance` is accepted for wire compatibility but the generator is
/// rule-based and does not bound candidates by edit distance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FuzzyOptions {
    pub max_distance: u32,
    #[serde(default = "default_true")]
    pub include_partial_matches: bool,
    pub custom_substitutions: HashMap<String, Vec<String>>,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            max_distance: 1,
            include_partial_matches: true,
            custom_substitutions: HashMap::new(),
        }
    }
}

/// Candidate accumulator with case-insensitive dedup / 候选集合（大小写无关去重）
struct CandidateSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl CandidateSet {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn insert(&mut self, candidate: String) {
        if candidate.is_empty() {
            return;
        }
        if self.seen.insert(candidate.to_lowercase()) {
            self.items.push(candidate);
        }
    }
}

/// Compiles queries into tolerant search patterns / 将查询编译为容错搜索模式
pub struct FuzzyPatternCompiler {
    min_word_len: usize,
}

impl Default for FuzzyPatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyPatternCompiler {
    pub fn new() -> Self {
        Self {
            min_word_len: MIN_FUZZY_LEN,
        }
    }

    /// Generate the candidate set for one word / 生成单个词的候选集
    ///
    /// The literal word is always the first candidate.
    pub fn word_candidates(&self, word: &str, options: &FuzzyOptions) -> Vec<String> {
        let mut set = CandidateSet::new();
        set.insert(word.to_string());

        let char_count = word.chars().count();

        // Single-character substitutions / 单字符替换
        // Only single-character table keys participate here; digraph keys are
        // covered by the phonetic pass below.
        let custom: HashMap<char, Vec<String>> = options
            .custom_substitutions
            .iter()
            .filter_map(|(k, v)| {
                let mut chars = k.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c.to_ascii_lowercase(), v.clone())),
                    _ => None,
                }
            })
            .collect();

        for (i, ch) in word.char_indices() {
            let lower = ch.to_ascii_lowercase();
            let alts: Vec<&str> = match custom.get(&lower) {
                Some(v) => v.iter().map(|s| s.as_str()).collect(),
                None => match SUBSTITUTIONS.get(&lower) {
                    Some(v) => v.clone(),
                    None => continue,
                },
            };
            for alt in alts {
                if alt.chars().count() == 1 && alt.chars().next() == Some(lower) {
                    continue;
                }
                let mut candidate = String::with_capacity(word.len() + alt.len());
                candidate.push_str(&word[..i]);
                candidate.push_str(alt);
                candidate.push_str(&word[i + ch.len_utf8()..]);
                set.insert(candidate);
            }
        }

        if char_count > MIN_FUZZY_LEN {
            // Single deletions / 单字符删除
            for (i, ch) in word.char_indices() {
                let mut candidate = String::with_capacity(word.len());
                candidate.push_str(&word[..i]);
                candidate.push_str(&word[i + ch.len_utf8()..]);
                set.insert(candidate);
            }

            // Doubled letters, only when not already doubled / 双写字母
            for &letter in DOUBLE_LETTERS {
                let single = letter.to_string();
                let doubled = format!("{}{}", letter, letter);
                if word.contains(letter) && !word.contains(&doubled) {
                    set.insert(word.replacen(&single, &doubled, 1));
                }
            }

            // Adjacent transpositions / 相邻字符交换
            let chars: Vec<char> = word.chars().collect();
            for i in 0..chars.len().saturating_sub(1) {
                let mut swapped = chars.clone();
                swapped.swap(i, i + 1);
                set.insert(swapped.into_iter().collect());
            }

            // Affix stripping, remainder must stay meaningful / 词缀剥离
            if options.include_partial_matches && char_count > MIN_AFFIX_LEN {
                for prefix in PREFIXES {
                    if word.starts_with(prefix) && char_count > prefix.len() + 2 {
                        set.insert(word[prefix.len()..].to_string());
                    }
                }
                for suffix in SUFFIXES {
                    if word.ends_with(suffix) && char_count > suffix.len() + 2 {
                        set.insert(word[..word.len() - suffix.len()].to_string());
                    }
                }
            }
        }

        // Phonetic rewrites / 语音改写
        if char_count >= 4 {
            for (from, to) in PHONETIC_RULES {
                if word.contains(from) {
                    set.insert(word.replace(from, to));
                }
            }
        }

        set.items
    }

    /// Compile a query into an extended-regex pattern / 将查询编译为扩展正则
    ///
    /// Each long-enough word becomes an alternation of its candidates; words
    /// are joined with `\s+` when flexible spacing is on, else a literal
    /// space. An empty query compiles to an empty pattern; callers reject
    /// empty queries before getting here.
    pub fn compile(
        &self,
        query: &str,
        fuzzy_enabled: bool,
        flexible_spacing: bool,
        options: &FuzzyOptions,
    ) -> String {
        let words: Vec<&str> = query.split_whitespace().collect();

        let groups: Vec<String> = words
            .iter()
            .map(|word| {
                if fuzzy_enabled && word.chars().count() > self.min_word_len {
                    let candidates = self.word_candidates(word, options);
                    format!("({})", candidates.join("|"))
                } else {
                    (*word).to_string()
                }
            })
            .collect();

        let separator = if flexible_spacing { "\\s+" } else { " " };
        groups.join(separator)
    }
}

/// Strip shell-hostile characters from a literal query / 去除危险字符
///
/// Used when neither fuzzing nor flexible spacing is requested and the query
/// is handed to the search tool as-is.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| {
            !matches!(
                c,
                ';' | '&' | '|' | '`' | '$' | '{' | '}' | '[' | ']' | '\\' | '<' | '>'
            )
        })
        .collect()
}
