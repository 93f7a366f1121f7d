//! Sequential batch orchestrator.

use std::time::Instant;

use rusqlite::Connection;
use tracing::{info, warn};

use super::analyzer::Analyzer;
use super::error::PipelineError;
use super::traits::{BlobStore, InferenceProvider};
use super::types::{BatchReport, DocumentOutcome};
use super::uploader::Uploader;
use crate::db::documents::{get_backlog, get_document};
use crate::models::DocumentStatus;

/// Process the current backlog, one document at a time.
///
/// The backlog is snapshotted once at the start; documents enqueued during
/// the run wait for the next batch. A document failure records its outcome
/// and the batch continues. Only a backlog read failure aborts.
pub fn run_batch(
    conn: &Connection,
    blob: &dyn BlobStore,
    provider: &dyn InferenceProvider,
    bucket: &str,
    owner_id: Option<&str>,
) -> Result<BatchReport, PipelineError> {
    let started = Instant::now();
    let backlog = get_backlog(conn, owner_id)?;

    if backlog.is_empty() {
        info!("Backlog empty, nothing to process");
        return Ok(BatchReport::empty());
    }

    info!(count = backlog.len(), "Starting batch run");

    let mut outcomes = Vec::with_capacity(backlog.len());
    let mut processed = 0u32;
    let mut failed = 0u32;

    for document in &backlog {
        let stage_error = match Uploader::run(conn, blob, provider, bucket, document) {
            Ok(handle) => {
                Analyzer::run(conn, provider, &document.id, &handle, &document.party)
                    .err()
                    .map(|e| e.to_string())
            }
            Err(e) => Some(e.to_string()),
        };

        // Re-read so the outcome reflects what the store actually says.
        let final_status = match get_document(conn, &document.id) {
            Ok(Some(stored)) => stored.status,
            Ok(None) => {
                warn!(document_id = %document.id, "Document vanished mid-batch");
                DocumentStatus::Error
            }
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "Status re-read failed");
                DocumentStatus::Error
            }
        };

        if final_status == DocumentStatus::Analyzed {
            processed += 1;
        } else {
            failed += 1;
        }

        outcomes.push(DocumentOutcome {
            document_id: document.id,
            final_status,
            error: stage_error,
        });
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        total = backlog.len(),
        processed, failed, duration_ms, "Batch run complete"
    );

    Ok(BatchReport {
        outcomes,
        processed,
        failed,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::documents::insert_document;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Document;
    use crate::pipeline::blob::MemoryBlobStore;
    use crate::pipeline::normalize::PLACEHOLDER_TEXT;
    use crate::pipeline::provider::MockProvider;

    #[test]
    fn empty_backlog_yields_empty_report() {
        let conn = open_memory_database().unwrap();
        let blob = MemoryBlobStore::new();
        let provider = MockProvider::new("[]");

        let report = run_batch(&conn, &blob, &provider, "contracts", None).unwrap();
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn mixed_batch_isolates_failures() {
        let conn = open_memory_database().unwrap();
        let blob = MemoryBlobStore::new();

        // missing.pdf has no blob; good.pdf parses; odd.pdf comes back as prose
        let missing = Document::new("o1", "missing.pdf", "o1/missing.pdf", 10, "Tenant");
        let good = Document::new("o1", "good.pdf", "o1/good.pdf", 10, "Tenant");
        let odd = Document::new("o1", "odd.pdf", "o1/odd.pdf", 10, "Tenant");
        insert_document(&conn, &missing).unwrap();
        insert_document(&conn, &good).unwrap();
        insert_document(&conn, &odd).unwrap();
        blob.insert("contracts", "o1/good.pdf", b"%PDF".to_vec());
        blob.insert("contracts", "o1/odd.pdf", b"%PDF".to_vec());

        let provider = MockProvider::new("no structure here at all")
            .with_response_for("good.pdf", r#"[{"text": "Deliver widgets"}]"#);

        let report = run_batch(&conn, &blob, &provider, "contracts", None).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);

        let stored_missing = get_document(&conn, &missing.id).unwrap().unwrap();
        assert_eq!(stored_missing.status, DocumentStatus::Error);

        let stored_good = get_document(&conn, &good.id).unwrap().unwrap();
        assert_eq!(stored_good.status, DocumentStatus::Analyzed);
        assert_eq!(stored_good.obligations.unwrap()[0].text, "Deliver widgets");

        let stored_odd = get_document(&conn, &odd.id).unwrap().unwrap();
        assert_eq!(stored_odd.status, DocumentStatus::Analyzed);
        assert_eq!(stored_odd.obligations.unwrap()[0].text, PLACEHOLDER_TEXT);
    }

    #[test]
    fn second_run_finds_no_backlog() {
        let conn = open_memory_database().unwrap();
        let blob = MemoryBlobStore::new();
        let doc = Document::new("o1", "a.pdf", "o1/a.pdf", 10, "Tenant");
        insert_document(&conn, &doc).unwrap();
        blob.insert("contracts", "o1/a.pdf", b"%PDF".to_vec());
        let provider = MockProvider::new("[]");

        let first = run_batch(&conn, &blob, &provider, "contracts", None).unwrap();
        assert_eq!(first.outcomes.len(), 1);

        let second = run_batch(&conn, &blob, &provider, "contracts", None).unwrap();
        assert!(second.outcomes.is_empty());
        assert_eq!(provider.uploads().len(), 1);
    }

    #[test]
    fn owner_scoping_skips_other_owners() {
        let conn = open_memory_database().unwrap();
        let blob = MemoryBlobStore::new();
        let mine = Document::new("o1", "a.pdf", "o1/a.pdf", 10, "Tenant");
        let theirs = Document::new("o2", "b.pdf", "o2/b.pdf", 10, "Tenant");
        insert_document(&conn, &mine).unwrap();
        insert_document(&conn, &theirs).unwrap();
        blob.insert("contracts", "o1/a.pdf", b"%PDF".to_vec());
        let provider = MockProvider::new("[]");

        let report = run_batch(&conn, &blob, &provider, "contracts", Some("o1")).unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].document_id, mine.id);

        let untouched = get_document(&conn, &theirs.id).unwrap().unwrap();
        assert_eq!(untouched.status, DocumentStatus::Pending);
    }
}
