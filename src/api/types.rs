//! Shared API state and extractors.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::pipeline::{FsBlobStore, InferenceProvider};
use crate::registry::ExportClient;

/// State shared by every handler. Cheap to clone; each handler opens its
/// own database connection from `config.db_path`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub blob: Arc<FsBlobStore>,
    pub provider: Arc<dyn InferenceProvider>,
    pub export: Arc<ExportClient>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        blob: FsBlobStore,
        provider: Arc<dyn InferenceProvider>,
        export: ExportClient,
    ) -> Self {
        Self {
            config: Arc::new(config),
            blob: Arc::new(blob),
            provider,
            export: Arc::new(export),
        }
    }
}

/// Authenticated caller identity, taken from the bearer token.
///
/// The token is treated as an opaque owner id; there is no account system
/// behind it, only row scoping.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        // The owner id doubles as a blob storage path component.
        if token.contains('/') || token.contains('\\') || token == "." || token == ".." {
            return Err(ApiError::Unauthorized);
        }

        Ok(OwnerId(token.to_string()))
    }
}
