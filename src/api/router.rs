//! Service router.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::AppState;

/// Build the API router. All routes require a bearer token, which scopes
/// every query to the calling owner.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(endpoints::documents::upload))
        .route("/documents", get(endpoints::documents::list))
        .route("/documents/process", post(endpoints::documents::process))
        .route("/registry", get(endpoints::registry::view))
        .route("/registry/export", post(endpoints::registry::export))
        .with_state(state)
}
