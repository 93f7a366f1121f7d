//! Registry consolidation over analyzed documents.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Document, DocumentStatus};

/// One registry row: an obligation tagged with its source document.
/// Built at consolidation time, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub source_document_id: Uuid,
    pub source_document_name: String,
}

/// Counts of where a document set stands.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressSnapshot {
    pub pending_count: usize,
    pub analyzed_count: usize,
    pub failed_count: usize,
    pub total: usize,
}

/// Merge obligations from every analyzed document into one registry.
///
/// Sort order: valid `YYYY-MM-DD` due dates ascending first, then entries
/// with missing or unparseable dates. Ties and the unparseable tail keep
/// their original relative order (per-document order, then document order).
pub fn consolidate(documents: &[Document]) -> Vec<RegistryEntry> {
    let mut entries: Vec<RegistryEntry> = documents
        .iter()
        .filter(|doc| doc.status == DocumentStatus::Analyzed)
        .flat_map(|doc| {
            doc.obligations
                .iter()
                .flatten()
                .map(|obligation| RegistryEntry {
                    text: obligation.text.clone(),
                    section: obligation.section.clone(),
                    due_date: obligation.due_date.clone(),
                    source_document_id: doc.id,
                    source_document_name: doc.filename.clone(),
                })
        })
        .collect();

    // (is_none, date): undated or unparseable entries sort after every
    // valid date; sort_by_key is stable so ties keep their input order.
    entries.sort_by_key(|entry| {
        let parsed = parse_due_date(entry.due_date.as_deref());
        (parsed.is_none(), parsed)
    });
    entries
}

/// Interpret a free-form due date. Accepts a plain date, an RFC 3339
/// datetime, or a timezone-less ISO datetime. `None` sorts after every
/// valid date.
fn parse_due_date(due_date: Option<&str>) -> Option<NaiveDate> {
    let raw = due_date?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Split a document set into progress counts.
pub fn partition_progress(documents: &[Document]) -> ProgressSnapshot {
    let pending_count = documents.iter().filter(|d| d.status.is_in_flight()).count();
    let analyzed_count = documents
        .iter()
        .filter(|d| d.status == DocumentStatus::Analyzed)
        .count();
    let failed_count = documents.iter().filter(|d| d.status.is_failed()).count();
    ProgressSnapshot {
        pending_count,
        analyzed_count,
        failed_count,
        total: documents.len(),
    }
}

/// Display heuristic: do these documents look like one upload batch?
/// True when every document's `updated_at` falls within ten minutes of the
/// most recent one. Affects presentation only.
pub fn is_same_upload_batch(documents: &[Document]) -> bool {
    let Some(latest) = documents.iter().map(|d| d.updated_at).max() else {
        return true;
    };
    let window = Duration::minutes(10);
    documents
        .iter()
        .all(|d| latest.signed_duration_since(d.updated_at) <= window)
}
