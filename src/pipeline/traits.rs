//! Trait seams between the pipeline and its external collaborators.
//!
//! The blob store and the inference provider are opaque: real
//! implementations talk HTTP/filesystem, fakes back the tests.

use super::blob::BlobError;
use super::error::PipelineError;

/// Opaque blob store keyed by bucket + path.
pub trait BlobStore: Send + Sync {
    /// Fetch the raw bytes of a stored object.
    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BlobError>;
}

/// Opaque AI inference provider.
pub trait InferenceProvider: Send + Sync {
    /// Push raw file bytes to the provider's file-ingestion endpoint and
    /// return the provider-side file handle.
    fn upload_file(&self, filename: &str, bytes: &[u8]) -> Result<String, PipelineError>;

    /// Run one extraction request against an uploaded file and return the
    /// raw text payload from the response envelope.
    fn extract(&self, file_handle: &str, prompt: &str) -> Result<String, PipelineError>;

    /// Delete a provider-side file. Best-effort: callers log failures and
    /// never let them mask the primary outcome.
    fn delete_file(&self, file_handle: &str) -> Result<(), PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify traits are object-safe (can be used as `dyn Trait`)
    #[test]
    fn traits_are_object_safe() {
        fn _assert_blob(_: &dyn BlobStore) {}
        fn _assert_provider(_: &dyn InferenceProvider) {}
    }
}
