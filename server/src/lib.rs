use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use engine::engine::{EngineConfig, SearchEngine, SearchOptions, SearchResponse};
use engine::score::ScoreMode;
use engine::store::{KvStore, SledStore};
use engine::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default = "default_only_available")]
    pub only_available: bool,
    pub mode: Option<ScoreMode>,
}

fn default_limit() -> usize {
    5
}
fn default_only_available() -> bool {
    true
}

#[derive(Serialize)]
pub struct HttpSearchResponse {
    pub query: String,
    pub took_s: f64,
    #[serde(flatten)]
    pub result: SearchResponse,
}

#[derive(Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub fn build_app(store_path: &str, config: EngineConfig) -> Result<Router> {
    let store = Arc::new(SledStore::open(store_path)?);
    Ok(build_app_with_store(store, config))
}

pub fn build_app_with_store(store: Arc<dyn KvStore>, config: EngineConfig) -> Router {
    let state = AppState {
        engine: Arc::new(SearchEngine::new(store, config)),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/discounted", get(discounted_handler))
        .route("/categories", get(categories_handler))
        .route("/brands", get(brands_handler))
        .route("/stats", get(stats_handler))
        .route("/product/:id", get(product_handler))
        .with_state(state)
        .layer(cors)
}

type HandlerResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

fn map_err(e: EngineError) -> (StatusCode, String) {
    let status = match e {
        EngineError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %e, "request failed");
    (status, e.to_string())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> HandlerResult<HttpSearchResponse> {
    let start = std::time::Instant::now();
    let options = SearchOptions {
        limit: params.limit.max(1).min(50),
        category: params.category,
        brand: params.brand,
        only_available: params.only_available,
        mode: params.mode,
    };
    let result = state.engine.search(&params.q, &options).map_err(map_err)?;
    Ok(Json(HttpSearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        result,
    }))
}

pub async fn discounted_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> HandlerResult<serde_json::Value> {
    let products = state
        .engine
        .discounted_products(params.limit.max(1).min(50))
        .map_err(map_err)?;
    Ok(Json(serde_json::json!({ "count": products.len(), "products": products })))
}

pub async fn categories_handler(State(state): State<AppState>) -> HandlerResult<serde_json::Value> {
    let categories = state.engine.categories().map_err(map_err)?;
    Ok(Json(serde_json::json!({ "categories": categories })))
}

pub async fn brands_handler(State(state): State<AppState>) -> HandlerResult<serde_json::Value> {
    let brands = state.engine.brands().map_err(map_err)?;
    Ok(Json(serde_json::json!({ "brands": brands })))
}

pub async fn stats_handler(State(state): State<AppState>) -> HandlerResult<engine::engine::EngineStats> {
    state.engine.stats().map(Json).map_err(map_err)
}

pub async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    match state.engine.product_by_id(&id).map_err(map_err)? {
        Some(product) => Ok(Json(serde_json::to_value(product).unwrap_or_default())),
        None => Err((StatusCode::NOT_FOUND, "not found".into())),
    }
}
