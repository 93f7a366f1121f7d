//! Document lifecycle model for the processing pipeline.
//!
//! A Document is created in `pending` state by the enqueue flow and mutated
//! exclusively through the status store by the two pipeline stages:
//!
//! ```text
//! pending ──uploader──▶ processing ──analyzer──▶ analyzed
//!    │                       │
//!    └──▶ error              └──▶ analysis_error
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::obligation::Obligation;

/// Lifecycle state of a document in the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Enqueued, not yet touched by the pipeline. No provider handle.
    Pending,
    /// Uploaded to the provider, awaiting analysis.
    Processing,
    /// Analysis complete. `obligations` is always set, possibly empty,
    /// possibly the single placeholder from an unparseable response.
    Analyzed,
    /// Blob retrieval or provider upload failed. Terminal.
    Error,
    /// The inference call itself failed. Terminal.
    AnalysisError,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Analyzed => "analyzed",
            Self::Error => "error",
            Self::AnalysisError => "analysis_error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "analyzed" => Some(Self::Analyzed),
            "error" => Some(Self::Error),
            "analysis_error" => Some(Self::AnalysisError),
            _ => None,
        }
    }

    /// Pending work from the client's point of view: the pipeline will
    /// still advance this document.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Failed terminal states, shown with a failure indicator and excluded
    /// from the obligations registry.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Error | Self::AnalysisError)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uploaded contract and its pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: String,
    pub filename: String,
    pub storage_ref: String,
    pub file_size_bytes: i64,
    /// Which contracting party the obligations are extracted for.
    pub party: String,
    pub status: DocumentStatus,
    pub provider_file_handle: Option<String>,
    pub obligations: Option<Vec<Obligation>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new pending document for the enqueue flow.
    pub fn new(
        owner_id: impl Into<String>,
        filename: impl Into<String>,
        storage_ref: impl Into<String>,
        file_size_bytes: i64,
        party: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            filename: filename.into(),
            storage_ref: storage_ref.into(),
            file_size_bytes,
            party: party.into(),
            status: DocumentStatus::Pending,
            provider_file_handle: None,
            obligations: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update accepted by the status store.
///
/// Restricted to the mutable pipeline fields; `updated_at` is refreshed on
/// every applied patch. Fields left `None` are not touched.
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub status: Option<DocumentStatus>,
    pub provider_file_handle: Option<String>,
    pub obligations: Option<Vec<Obligation>>,
    pub error_message: Option<String>,
}

impl StatusPatch {
    /// Uploader success: attach the provider handle, move to processing.
    pub fn processing(handle: impl Into<String>) -> Self {
        Self {
            status: Some(DocumentStatus::Processing),
            provider_file_handle: Some(handle.into()),
            ..Default::default()
        }
    }

    /// Analyzer success (or degraded parse): attach results, move to analyzed.
    pub fn analyzed(obligations: Vec<Obligation>) -> Self {
        Self {
            status: Some(DocumentStatus::Analyzed),
            obligations: Some(obligations),
            ..Default::default()
        }
    }

    /// Terminal failure with a persisted message.
    pub fn failed(status: DocumentStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.provider_file_handle.is_none()
            && self.obligations.is_none()
            && self.error_message.is_none()
    }
}
