//! Pipeline-specific error taxonomy.
//!
//! Each variant maps to a status transition: `Retrieval` and
//! `ProviderUpload` are terminal for the uploader (→ error),
//! `ProviderInference` is terminal for the analyzer (→ analysis_error).
//! `ResponseParse` never surfaces from a stage; the normalization cascade
//! degrades it to a placeholder obligation instead. `Persistence` means a
//! store write failed after a remote side effect already happened; it is
//! logged and may orphan a provider-side file.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Blob retrieval failed: {0}")]
    Retrieval(String),

    #[error("Provider file upload failed: {0}")]
    ProviderUpload(String),

    #[error("Provider inference failed: {0}")]
    ProviderInference(String),

    #[error("Provider file release failed: {0}")]
    FileRelease(String),

    #[error("Provider response was not structured: {0}")]
    ResponseParse(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}
