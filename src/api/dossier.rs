/// Dossier lookup endpoints
use crate::{
    context::AppContext,
    dossier::{DossierLookup, ErrorKind, ErrorResult},
    error::ProxyResult,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Build dossier routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/dossier/:jurisdiction_id/:dossier_id", get(get_dossier))
        .route("/dossier", post(post_dossier))
}

#[derive(Debug, Deserialize)]
pub struct DossierRequest {
    pub id_juridiction: String,
    pub id_dossier: String,
}

/// Success body
#[derive(Debug, Serialize)]
struct DossierResponse {
    source: &'static str,
    data: Value,
}

/// Orchestration-level failure body
#[derive(Debug, Serialize)]
struct DossierErrorResponse {
    source: &'static str,
    error: ErrorKind,
    message: String,
    data: Value,
}

async fn get_dossier(
    State(ctx): State<AppContext>,
    Path((jurisdiction_id, dossier_id)): Path<(String, String)>,
) -> ProxyResult<Response> {
    lookup(&ctx, &jurisdiction_id, &dossier_id).await
}

async fn post_dossier(
    State(ctx): State<AppContext>,
    payload: Result<Json<DossierRequest>, JsonRejection>,
) -> ProxyResult<Response> {
    let Json(req) = payload?;
    lookup(&ctx, &req.id_juridiction, &req.id_dossier).await
}

async fn lookup(ctx: &AppContext, jurisdiction_id: &str, dossier_id: &str) -> ProxyResult<Response> {
    info!(jurisdiction = %jurisdiction_id, dossier = %dossier_id, "Dossier lookup");

    let response = match ctx.dossiers.lookup(jurisdiction_id, dossier_id).await? {
        DossierLookup::Cached(data) => Json(DossierResponse { source: "cache", data }).into_response(),
        DossierLookup::Fetched(data) => Json(DossierResponse { source: "api", data }).into_response(),
        DossierLookup::Failed(err) => failure_response(err),
    };
    Ok(response)
}

fn failure_response(err: ErrorResult) -> Response {
    // A failed primary call is a gateway problem; an unusable answer is not
    let status = match err.kind {
        ErrorKind::NotFound => StatusCode::OK,
        ErrorKind::FetchError => StatusCode::BAD_GATEWAY,
    };

    let body = DossierErrorResponse {
        source: "api",
        error: err.kind,
        message: err.message,
        data: err.partial_carte,
    };
    (status, Json(body)).into_response()
}
