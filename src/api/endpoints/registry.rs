//! Registry endpoints: consolidated view and export.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{AppState, OwnerId};
use crate::db::documents::list_documents;
use crate::db::filter::{DocumentField, DocumentFilter, Predicate};
use crate::db::sqlite::open_database;
use crate::models::Document;
use crate::registry::{
    consolidate, is_same_upload_batch, partition_progress, ProgressSnapshot, RegistryEntry,
};

#[derive(Serialize)]
pub struct RegistryResponse {
    pub entries: Vec<RegistryEntry>,
    pub progress: ProgressSnapshot,
    /// Display hint: all documents settled within one upload window.
    pub same_upload_batch: bool,
}

#[derive(Deserialize)]
pub struct ExportRequest {
    /// Display name stamped on the exported registry.
    pub full_name: String,
}

#[derive(Serialize)]
pub struct ExportResponse {
    pub document_url: String,
}

fn owner_documents(state: &AppState, owner: &str) -> Result<Vec<Document>, ApiError> {
    let conn = open_database(&state.config.db_path)?;
    let filter = DocumentFilter::new().with(Predicate::eq(DocumentField::OwnerId, owner));
    Ok(list_documents(&conn, &filter)?)
}

/// `GET /registry` — consolidated obligations plus progress counts.
pub async fn view(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<RegistryResponse>, ApiError> {
    let documents = tokio::task::spawn_blocking(move || owner_documents(&state, &owner))
        .await
        .map_err(|e| ApiError::Internal(format!("Registry task failed: {e}")))??;

    let entries = consolidate(&documents);
    let progress = partition_progress(&documents);
    let same_upload_batch = is_same_upload_batch(&documents);

    Ok(Json(RegistryResponse {
        entries,
        progress,
        same_upload_batch,
    }))
}

/// `POST /registry/export` — push the consolidated registry to the export
/// sink. An empty registry is rejected before the sink is contacted.
pub async fn export(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Json(payload): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, ApiError> {
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Full name is required".into()));
    }

    let document_url = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let documents = owner_documents(&state, &owner)?;
        let entries = consolidate(&documents);
        Ok(state.export.export(&payload.full_name, &entries)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Export task failed: {e}")))??;

    Ok(Json(ExportResponse { document_url }))
}
