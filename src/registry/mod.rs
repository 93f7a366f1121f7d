//! Consolidated obligations registry.
//!
//! Client-side view over analyzed documents: merge obligations into one
//! date-sorted registry, track pending work, poll for completion, export
//! to the document sink.

pub mod consolidate;
pub mod export;
pub mod watcher;

pub use consolidate::{
    consolidate, is_same_upload_batch, partition_progress, ProgressSnapshot, RegistryEntry,
};
pub use export::{ExportClient, ExportError};
pub use watcher::{start_polling, PollHandle};
