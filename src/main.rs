use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use filesearch_backend::config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filesearch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().expect("Failed to load configuration");
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create cache directory if not exists / 创建缓存目录
    let cache_dir = app_config.get_cache_dir();
    if !cache_dir.exists() {
        std::fs::create_dir_all(&cache_dir)?;
        tracing::info!("Created cache directory: {:?}", cache_dir);
    }

    let state = Arc::new(AppState::new(app_config.clone()));

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route(
            "/api/files/list",
            get(api::files::list_get).post(api::files::list_post),
        )
        .route(
            "/api/files/content",
            get(api::files::content_get).post(api::files::content_post),
        )
        .route("/api/files/folders", get(api::files::folders))
        .route("/api/files/open", post(api::files::open))
        .route(
            "/api/search/content",
            get(api::search::content_search_get).post(api::search::content_search_post),
        )
        .route(
            "/api/search/files",
            get(api::search::ranked_search_get).post(api::search::ranked_search_post),
        )
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
