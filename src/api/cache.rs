/// Cache introspection and flush
use crate::{cache::CacheStats, context::AppContext};
use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

/// Build cache routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache", delete(clear_cache))
}

async fn cache_stats(State(ctx): State<AppContext>) -> Json<CacheStats> {
    Json(ctx.cache.stats())
}

async fn clear_cache(State(ctx): State<AppContext>) -> Json<Value> {
    let removed = ctx.cache.clear();
    info!(removed, "Cache cleared via API");

    Json(json!({
        "message": "Cache cleared",
        "removed": removed,
    }))
}
