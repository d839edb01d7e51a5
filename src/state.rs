use filesearch_backend::cache::JsonCache;
use filesearch_backend::config::AppConfig;
use filesearch_backend::content::{ContentSearcher, GrepSearchProvider};
use filesearch_backend::indexer::DirectoryIndexer;
use filesearch_backend::models::SearchResponse;
use filesearch_backend::provider::OpenRouterProvider;
use filesearch_backend::ranker::RelevanceRanker;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state / 共享应用状态
///
/// Service objects are constructed once per process and injected into
/// handlers; the two caches serialize their own disk writes internally.
pub struct AppState {
    pub config: AppConfig,
    pub indexer: DirectoryIndexer,
    pub search_cache: JsonCache<SearchResponse>,
    pub searcher: ContentSearcher,
    pub ranker: RelevanceRanker,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let index_cache = JsonCache::open(config.get_index_cache_path(), config.index_ttl());
        let search_cache = JsonCache::open(config.get_search_cache_path(), config.search_ttl());

        let indexer = DirectoryIndexer::new(&config.indexer, index_cache);

        let grep = Arc::new(GrepSearchProvider::new(Duration::from_secs(
            config.content_search.tool_timeout_secs,
        )));
        let searcher = ContentSearcher::new(
            grep,
            config.content_search.context_limit,
            config.content_search.context_lines,
        );

        let provider = Arc::new(OpenRouterProvider::new(&config.provider));
        let ranker = RelevanceRanker::new(provider);

        Self {
            config,
            indexer,
            search_cache,
            searcher,
            ranker,
        }
    }
}
