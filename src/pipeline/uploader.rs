//! Uploader stage: blob bytes to provider-side file.
//!
//! Failures before the provider holds the file are terminal `error`.
//! A persistence failure after a successful upload orphans the
//! provider-side handle; that is logged loudly and surfaced, never hidden.

use rusqlite::Connection;
use tracing::{error, info, warn};

use super::error::PipelineError;
use super::traits::{BlobStore, InferenceProvider};
use crate::db::documents::update_status;
use crate::models::{Document, DocumentStatus, StatusPatch};

pub struct Uploader;

impl Uploader {
    /// Move one pending document to `processing` by pushing its bytes to
    /// the provider. Returns the provider file handle.
    pub fn run(
        conn: &Connection,
        blob: &dyn BlobStore,
        provider: &dyn InferenceProvider,
        bucket: &str,
        document: &Document,
    ) -> Result<String, PipelineError> {
        let bytes = match blob.download(bucket, &document.storage_ref) {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = e.to_string();
                error!(
                    document_id = %document.id,
                    storage_ref = %document.storage_ref,
                    error = %message,
                    "Blob retrieval failed"
                );
                record_failure(conn, document, &message);
                return Err(PipelineError::Retrieval(message));
            }
        };

        info!(
            document_id = %document.id,
            filename = %document.filename,
            size = bytes.len(),
            "Uploading document to provider"
        );

        let handle = match provider.upload_file(&document.filename, &bytes) {
            Ok(handle) => handle,
            Err(e) => {
                let message = e.to_string();
                error!(
                    document_id = %document.id,
                    error = %message,
                    "Provider upload failed"
                );
                record_failure(conn, document, &message);
                return Err(e);
            }
        };

        if let Err(e) = update_status(conn, &document.id, &StatusPatch::processing(&handle)) {
            warn!(
                document_id = %document.id,
                file_handle = %handle,
                error = %e,
                "Handle persisted nowhere, provider-side file orphaned"
            );
            return Err(PipelineError::Persistence(e));
        }

        Ok(handle)
    }
}

/// Mark the document failed. A second store failure here has nothing left
/// to compensate with, so it is only logged.
fn record_failure(conn: &Connection, document: &Document, message: &str) {
    let patch = StatusPatch::failed(DocumentStatus::Error, message);
    if let Err(e) = update_status(conn, &document.id, &patch) {
        warn!(
            document_id = %document.id,
            error = %e,
            "Could not record upload failure"
        );
    }
}
