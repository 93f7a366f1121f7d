//! Document processing pipeline.
//!
//! Moves each uploaded contract through its lifecycle:
//! ```text
//! Backlog scan → Uploader (blob → provider file) → Analyzer (inference → obligations)
//! ```
//!
//! Design principles:
//! - Strictly sequential: one document, one provider call at a time. This
//!   bounds load on the external provider; batch latency scales linearly
//!   with backlog size.
//! - Per-document failure isolation: a failed document records its status
//!   and the batch moves on.
//! - Each stage performs at most one attempt per batch; retry happens only
//!   when a document re-enters the backlog.

pub mod analyzer;
pub mod blob;
pub mod error;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod runner;
pub mod traits;
pub mod types;
pub mod uploader;

pub use analyzer::Analyzer;
pub use blob::{BlobError, FsBlobStore, MemoryBlobStore};
pub use error::PipelineError;
pub use normalize::normalize_response;
pub use provider::{HttpProvider, MockProvider};
pub use runner::run_batch;
pub use traits::{BlobStore, InferenceProvider};
pub use types::{BatchReport, DocumentOutcome};
pub use uploader::Uploader;
