/// Key rotation endpoints
use crate::{context::AppContext, crypto::EncodedKeyPair, error::ProxyResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

/// Build key routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/keys", get(get_keys).put(put_keys))
}

/// Validate and install a new key pair; flushes the cache
async fn put_keys(
    State(ctx): State<AppContext>,
    payload: Result<Json<EncodedKeyPair>, JsonRejection>,
) -> ProxyResult<Json<Value>> {
    let Json(req) = payload?;
    let removed = ctx.key_store.set_encoded(&req)?;
    info!(removed, "Keys rotated via API");

    Ok(Json(json!({ "message": "Keys updated" })))
}

/// Current key pair, unmasked
async fn get_keys(State(ctx): State<AppContext>) -> Json<EncodedKeyPair> {
    Json(ctx.key_store.get().to_encoded())
}
