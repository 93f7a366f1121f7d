//! HTTP service surface.
//!
//! Thin axum layer over the pipeline and registry: upload contracts, list
//! documents, trigger a processing batch, read and export the registry.
//! The bearer token is an opaque owner id; every route is scoped to it.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::{AppState, OwnerId};
