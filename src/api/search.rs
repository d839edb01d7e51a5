//! Content and ranked search endpoints / 内容搜索与相关性搜索接口

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{parse_bool, parse_usize};
use crate::state::AppState;
use filesearch_backend::cache::{file_set_hash, search_cache_key};
use filesearch_backend::content::ContentSearchOptions;
use filesearch_backend::fuzzy::FuzzyOptions;
use filesearch_backend::models::{ContentSearchResponse, FileEntry, SearchResponse};
use filesearch_backend::ranker::partition_results;

fn default_content_max_results() -> usize {
    100
}

fn default_ranked_max_results() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearchBody {
    pub query: Option<String>,
    pub folder: Option<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_content_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub enable_fuzzy: bool,
    #[serde(default)]
    pub enable_flexible_spacing: bool,
    #[serde(default)]
    pub fuzzy_options: FuzzyOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearchQuery {
    pub q: Option<String>,
    pub query: Option<String>,
    pub folder: Option<String>,
    /// Comma-separated globs / 逗号分隔
    pub file_types: Option<String>,
    pub exclude_dirs: Option<String>,
    pub case_sensitive: Option<String>,
    pub max_results: Option<String>,
    pub enable_fuzzy: Option<String>,
    pub enable_flexible_spacing: Option<String>,
    pub max_distance: Option<String>,
    pub include_partial_matches: Option<String>,
    /// Compact form: "a:e,i ph:f" / 紧凑形式
    pub custom_substitutions: Option<String>,
}

/// Parse the compact custom-substitutions form / 解析紧凑的自定义替换表
fn parse_custom_substitutions(raw: &str) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    for pair in raw.split_whitespace() {
        if let Some((key, values)) = pair.split_once(':') {
            let key = key.trim();
            let values: Vec<String> = values
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if !key.is_empty() && !values.is_empty() {
                map.insert(key.to_string(), values);
            }
        }
    }
    map
}

/// POST /api/search/content - 内容搜索
pub async fn content_search_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContentSearchBody>,
) -> (StatusCode, Json<ContentSearchResponse>) {
    let query = body.query.unwrap_or_default();
    let folder = body
        .folder
        .unwrap_or_else(|| state.config.indexer.default_folder.clone());
    let options = ContentSearchOptions {
        file_types: body.file_types,
        exclude_dirs: body.exclude_dirs,
        case_sensitive: body.case_sensitive,
        max_results: body.max_results,
        enable_fuzzy: body.enable_fuzzy,
        enable_flexible_spacing: body.enable_flexible_spacing,
        fuzzy: body.fuzzy_options,
    };
    content_search_impl(&state, &query, &folder, options).await
}

/// GET /api/search/content
pub async fn content_search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentSearchQuery>,
) -> (StatusCode, Json<ContentSearchResponse>) {
    let query = params.q.or(params.query).unwrap_or_default();
    let folder = params
        .folder
        .unwrap_or_else(|| state.config.indexer.default_folder.clone());

    let split_list = |raw: Option<String>| -> Vec<String> {
        raw.map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
    };

    let fuzzy = FuzzyOptions {
        max_distance: params
            .max_distance
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        include_partial_matches: parse_bool(params.include_partial_matches.as_deref(), true),
        custom_substitutions: params
            .custom_substitutions
            .as_deref()
            .map(parse_custom_substitutions)
            .unwrap_or_default(),
    };

    let options = ContentSearchOptions {
        file_types: split_list(params.file_types),
        exclude_dirs: split_list(params.exclude_dirs),
        case_sensitive: parse_bool(params.case_sensitive.as_deref(), false),
        max_results: parse_usize(params.max_results.as_deref(), 100),
        enable_fuzzy: parse_bool(params.enable_fuzzy.as_deref(), false),
        enable_flexible_spacing: parse_bool(params.enable_flexible_spacing.as_deref(), false),
        fuzzy,
    };
    content_search_impl(&state, &query, &folder, options).await
}

async fn content_search_impl(
    state: &AppState,
    query: &str,
    folder: &str,
    options: ContentSearchOptions,
) -> (StatusCode, Json<ContentSearchResponse>) {
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ContentSearchResponse::failure(
                query,
                folder,
                "Query parameter is required",
            )),
        );
    }

    match state.searcher.search(query, folder, &options).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ContentSearchResponse {
                success: true,
                results: outcome.matches,
                query: query.to_string(),
                total_matches: outcome.total_matches,
                searched_folder: folder.to_string(),
                execution_time: outcome.elapsed_ms,
                command: outcome.command,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Content search for \"{}\" failed: {}", query, e);
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(ContentSearchResponse::failure(query, folder, &e.to_string())),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSearchBody {
    pub query: Option<String>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    pub folder: Option<String>,
    #[serde(default = "default_ranked_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSearchQuery {
    pub q: Option<String>,
    pub query: Option<String>,
    pub folder: Option<String>,
    pub max_results: Option<String>,
    pub fresh: Option<String>,
}

/// POST /api/search/files - 相关性搜索
///
/// Accepts an inline candidate list, or a folder to index server-side.
pub async fn ranked_search_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RankedSearchBody>,
) -> (StatusCode, Json<SearchResponse>) {
    let query = body.query.unwrap_or_default();
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SearchResponse::failure(&query, 0, "Query is required")),
        );
    }

    let files = if !body.files.is_empty() {
        body.files
    } else {
        match load_candidates(&state, body.folder.as_deref()) {
            Ok(files) => files,
            Err(response) => return response,
        }
    };

    ranked_search_impl(&state, &query, files, body.max_results, body.fresh).await
}

/// GET /api/search/files
pub async fn ranked_search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankedSearchQuery>,
) -> (StatusCode, Json<SearchResponse>) {
    let query = params.q.or(params.query).unwrap_or_default();
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SearchResponse::failure(
                &query,
                0,
                "Query parameter (q or query) is required",
            )),
        );
    }

    let files = match load_candidates(&state, params.folder.as_deref()) {
        Ok(files) => files,
        Err(response) => return response,
    };

    let max_results = parse_usize(params.max_results.as_deref(), 10);
    let fresh = parse_bool(params.fresh.as_deref(), false);
    ranked_search_impl(&state, &query, files, max_results, fresh).await
}

/// Index a folder into ranking candidates / 将目录索引为候选集
fn load_candidates(
    state: &AppState,
    folder: Option<&str>,
) -> Result<Vec<FileEntry>, (StatusCode, Json<SearchResponse>)> {
    let folder = folder
        .map(|f| f.to_string())
        .unwrap_or_else(|| state.config.indexer.default_folder.clone());

    let files = match state.indexer.index(&folder, false) {
        Ok(outcome) => outcome.files,
        Err(e) => {
            tracing::warn!("Indexing {} for ranked search failed: {}", folder, e);
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return Err((status, Json(SearchResponse::failure("", 0, &e.to_string()))));
        }
    };

    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(SearchResponse::failure(
                "",
                0,
                "No files found in the specified folder",
            )),
        ));
    }
    Ok(files)
}

async fn ranked_search_impl(
    state: &AppState,
    query: &str,
    files: Vec<FileEntry>,
    max_results: usize,
    fresh: bool,
) -> (StatusCode, Json<SearchResponse>) {
    tracing::info!("Ranked search for \"{}\" over {} files", query, files.len());

    let file_hash = file_set_hash(&files);
    let cache_key = search_cache_key(query, &file_hash);
    tracing::debug!("Cache key: {} (query hash + file hash)", cache_key);

    if fresh {
        tracing::debug!("Fresh search requested for \"{}\"", query);
        state.search_cache.remove(&cache_key);
    } else if let Some(entry) = state.search_cache.get(&cache_key) {
        tracing::info!("Using cached search results for \"{}\"", query);
        let mut response = entry.data;
        response.cached = true;
        response.cache_timestamp = Some(entry.timestamp);
        response.cache_key = Some(cache_key);
        return (StatusCode::OK, Json(response));
    }

    let results = state.ranker.rank(query, &files, max_results).await;
    let (file_results, folder_results) = partition_results(&results);

    let response = SearchResponse {
        success: true,
        results,
        file_results,
        folder_results,
        query: query.to_string(),
        total_files: files.len(),
        cached: false,
        cache_timestamp: Some(Utc::now().timestamp_millis()),
        cache_key: Some(cache_key.clone()),
        error: None,
    };

    state.search_cache.put(&cache_key, response.clone());
    (StatusCode::OK, Json(response))
}
