/// HTTP service boundary
pub mod cache;
pub mod dossier;
pub mod health;
pub mod keys;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(dossier::routes())
        .merge(keys::routes())
        .merge(cache::routes())
        .merge(health::routes())
}
