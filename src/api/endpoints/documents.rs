//! Document endpoints: upload, listing, batch trigger.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{AppState, OwnerId};
use crate::db::documents::{insert_document, list_documents};
use crate::db::filter::{DocumentField, DocumentFilter, Predicate};
use crate::db::sqlite::open_database;
use crate::models::Document;
use crate::pipeline::{run_batch, BatchReport};
use crate::registry::{partition_progress, ProgressSnapshot};

/// Maximum upload size in bytes (20 MB).
const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// Party whose obligations should be extracted.
    pub party: String,
    /// Base64 file content, with or without a `data:...;base64,` prefix.
    pub data: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub progress: ProgressSnapshot,
}

/// `POST /documents` — store the contract blob and enqueue it as pending.
pub async fn upload(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let filename = payload.filename.trim();
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Filename is required".into()));
    }
    // The filename becomes one component of the blob storage path.
    if filename.contains('/') || filename.contains('\\') || filename == "." || filename == ".."
    {
        return Err(ApiError::BadRequest(
            "Filename must be a plain file name without path separators".into(),
        ));
    }
    if payload.party.trim().is_empty() {
        return Err(ApiError::BadRequest("Party is required".into()));
    }

    let encoded = payload
        .data
        .rsplit_once("base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(&payload.data);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 content: {e}")))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File content is empty".into()));
    }
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ApiError::BadRequest(format!(
            "File exceeds 20 MB size limit ({} bytes)",
            bytes.len()
        )));
    }

    let storage_ref = format!("{}/{}-{}", owner, Uuid::new_v4(), filename);
    let document = Document::new(
        owner,
        filename,
        storage_ref,
        bytes.len() as i64,
        payload.party,
    );
    let document_id = document.id;

    let result = tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        state
            .blob
            .store(&state.config.upload_bucket, &document.storage_ref, &bytes)?;
        let conn = open_database(&state.config.db_path)?;
        insert_document(&conn, &document)?;
        Ok(())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Upload task failed: {e}")))?;
    result?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_id,
            status: "pending",
        }),
    ))
}

/// `GET /documents` — the caller's documents with progress counts.
/// Failed documents surface through their status and `error_message`.
pub async fn list(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = tokio::task::spawn_blocking(move || -> Result<Vec<Document>, ApiError> {
        let conn = open_database(&state.config.db_path)?;
        let filter = DocumentFilter::new().with(Predicate::eq(DocumentField::OwnerId, owner));
        Ok(list_documents(&conn, &filter)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("List task failed: {e}")))??;

    let progress = partition_progress(&documents);
    Ok(Json(DocumentListResponse {
        documents,
        progress,
    }))
}

/// `POST /documents/process` — run one pipeline batch over the caller's
/// backlog. Blocking work runs off the async executor; the report comes
/// back when the batch finishes.
pub async fn process(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<BatchReport>, ApiError> {
    let report = tokio::task::spawn_blocking(move || -> Result<BatchReport, ApiError> {
        let conn = open_database(&state.config.db_path)?;
        Ok(run_batch(
            &conn,
            state.blob.as_ref(),
            state.provider.as_ref(),
            &state.config.upload_bucket,
            Some(&owner),
        )?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Batch task failed: {e}")))??;

    Ok(Json(report))
}
