//! Analyzer stage: provider inference to persisted obligations.
//!
//! Inference failure is terminal `analysis_error` and releases the
//! provider-side file. Unparseable output is NOT a failure: the
//! normalization cascade degrades it to a placeholder and the document
//! still reaches `analyzed`. After successful persistence the file is
//! released best-effort; after a persistence failure it is deliberately
//! kept so a manual retry does not have to re-upload.

use rusqlite::Connection;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::PipelineError;
use super::normalize::normalize_response;
use super::prompt::build_extraction_prompt;
use super::traits::InferenceProvider;
use crate::db::documents::update_status;
use crate::models::{DocumentStatus, Obligation, StatusPatch};

pub struct Analyzer;

impl Analyzer {
    /// Run extraction for one processing document and persist the result.
    pub fn run(
        conn: &Connection,
        provider: &dyn InferenceProvider,
        document_id: &Uuid,
        file_handle: &str,
        party: &str,
    ) -> Result<Vec<Obligation>, PipelineError> {
        let prompt = build_extraction_prompt(party);

        let raw = match provider.extract(file_handle, &prompt) {
            Ok(raw) => raw,
            Err(e) => {
                let message = e.to_string();
                error!(
                    document_id = %document_id,
                    error = %message,
                    "Provider inference failed"
                );
                let patch = StatusPatch::failed(DocumentStatus::AnalysisError, &message);
                if let Err(db_err) = update_status(conn, document_id, &patch) {
                    warn!(
                        document_id = %document_id,
                        error = %db_err,
                        "Could not record analysis failure"
                    );
                }
                release_file(provider, document_id, file_handle);
                return Err(e);
            }
        };

        let obligations = normalize_response(&raw);
        info!(
            document_id = %document_id,
            count = obligations.len(),
            "Obligations normalized"
        );

        if let Err(e) = update_status(conn, document_id, &StatusPatch::analyzed(obligations.clone()))
        {
            // File handle stays valid so a retry can skip re-upload.
            warn!(
                document_id = %document_id,
                file_handle = %file_handle,
                error = %e,
                "Obligations extracted but not persisted, keeping provider file"
            );
            return Err(PipelineError::Persistence(e));
        }

        release_file(provider, document_id, file_handle);
        Ok(obligations)
    }
}

/// Best-effort release of the provider-side file. Never alters the
/// document's outcome.
fn release_file(provider: &dyn InferenceProvider, document_id: &Uuid, file_handle: &str) {
    if let Err(e) = provider.delete_file(file_handle) {
        warn!(
            document_id = %document_id,
            file_handle = %file_handle,
            error = %e,
            "Provider file release failed"
        );
    }
}
