//! Status store: the single writer of persisted Document state.
//!
//! Pipeline stages read-modify-write through `update_status`; no other
//! component mutates document rows. Concurrent writers are not coordinated:
//! last writer wins, which this workload accepts.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::filter::{backlog_filter, DocumentFilter};
use super::DatabaseError;
use crate::models::{Document, DocumentStatus, Obligation, StatusPatch};

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const DOCUMENT_COLUMNS: &str = "id, owner_id, filename, storage_ref, file_size_bytes, party, \
     status, provider_file_handle, obligations, error_message, created_at, updated_at";

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(field: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupted {
            field: field.to_string(),
            reason: format!("{raw}: {e}"),
        })
}

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    let obligations_json = doc
        .obligations
        .as_ref()
        .map(|obs| serde_json::to_string(obs))
        .transpose()
        .map_err(|e| DatabaseError::Corrupted {
            field: "obligations".into(),
            reason: e.to_string(),
        })?;

    conn.execute(
        "INSERT INTO documents (id, owner_id, filename, storage_ref, file_size_bytes, party,
         status, provider_file_handle, obligations, error_message, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            doc.id.to_string(),
            doc.owner_id,
            doc.filename,
            doc.storage_ref,
            doc.file_size_bytes,
            doc.party,
            doc.status.as_str(),
            doc.provider_file_handle,
            obligations_json,
            doc.error_message,
            format_ts(&doc.created_at),
            format_ts(&doc.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], row_to_document_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List documents matching a compiled predicate filter, oldest first.
pub fn list_documents(
    conn: &Connection,
    filter: &DocumentFilter,
) -> Result<Vec<Document>, DatabaseError> {
    let (where_clause, filter_params) = filter.to_sql();
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents{where_clause} ORDER BY created_at ASC, id ASC"
    ))?;

    let rows = stmt.query_map(params_from_iter(filter_params), row_to_document_row)?;

    let mut documents = Vec::new();
    for row in rows {
        documents.push(document_from_row(row?)?);
    }
    Ok(documents)
}

/// The backlog snapshot: `status = pending AND provider_file_handle IS NULL`,
/// optionally scoped to one owner.
pub fn get_backlog(
    conn: &Connection,
    owner_id: Option<&str>,
) -> Result<Vec<Document>, DatabaseError> {
    list_documents(conn, &backlog_filter(owner_id))
}

/// Apply a restricted partial update to one document.
///
/// Only the pipeline-mutable fields are accepted; `updated_at` is always
/// refreshed. Empty patches are rejected rather than silently writing a
/// bare timestamp bump.
pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    patch: &StatusPatch,
) -> Result<(), DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::Corrupted {
            field: "patch".into(),
            reason: "empty status patch".into(),
        });
    }

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(status) = patch.status {
        values.push(status.as_str().to_string().into());
        sets.push(format!("status = ?{}", values.len()));
    }
    if let Some(handle) = &patch.provider_file_handle {
        values.push(handle.clone().into());
        sets.push(format!("provider_file_handle = ?{}", values.len()));
    }
    if let Some(obligations) = &patch.obligations {
        let json = serde_json::to_string(obligations).map_err(|e| DatabaseError::Corrupted {
            field: "obligations".into(),
            reason: e.to_string(),
        })?;
        values.push(json.into());
        sets.push(format!("obligations = ?{}", values.len()));
    }
    if let Some(message) = &patch.error_message {
        values.push(message.clone().into());
        sets.push(format!("error_message = ?{}", values.len()));
    }

    values.push(format_ts(&Utc::now()).into());
    sets.push(format!("updated_at = ?{}", values.len()));

    values.push(id.to_string().into());
    let sql = format!(
        "UPDATE documents SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    let rows = conn.execute(&sql, params_from_iter(values))?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Internal row mapping
// ═══════════════════════════════════════════

struct DocumentRow {
    id: String,
    owner_id: String,
    filename: String,
    storage_ref: String,
    file_size_bytes: i64,
    party: String,
    status: String,
    provider_file_handle: Option<String>,
    obligations: Option<String>,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        filename: row.get(2)?,
        storage_ref: row.get(3)?,
        file_size_bytes: row.get(4)?,
        party: row.get(5)?,
        status: row.get(6)?,
        provider_file_handle: row.get(7)?,
        obligations: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    let status =
        DocumentStatus::from_str(&row.status).ok_or_else(|| DatabaseError::InvalidEnum {
            field: "status".into(),
            value: row.status.clone(),
        })?;

    let id = Uuid::parse_str(&row.id).map_err(|e| DatabaseError::Corrupted {
        field: "id".into(),
        reason: e.to_string(),
    })?;

    let obligations: Option<Vec<Obligation>> = row
        .obligations
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| DatabaseError::Corrupted {
            field: "obligations".into(),
            reason: e.to_string(),
        })?;

    Ok(Document {
        id,
        owner_id: row.owner_id,
        filename: row.filename,
        storage_ref: row.storage_ref,
        file_size_bytes: row.file_size_bytes,
        party: row.party,
        status,
        provider_file_handle: row.provider_file_handle,
        obligations,
        error_message: row.error_message,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn make_doc(owner: &str, filename: &str) -> Document {
        Document::new(
            owner,
            filename,
            format!("contracts/{owner}/{filename}"),
            2048,
            "Acme Ltd",
        )
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let conn = open_memory_database().unwrap();
        let doc = make_doc("user-1", "msa.pdf");
        insert_document(&conn, &doc).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.owner_id, "user-1");
        assert_eq!(loaded.status, DocumentStatus::Pending);
        assert!(loaded.provider_file_handle.is_none());
        assert!(loaded.obligations.is_none());
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_document(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn backlog_selects_only_untouched_pending() {
        let conn = open_memory_database().unwrap();

        let pending = make_doc("user-1", "a.pdf");
        insert_document(&conn, &pending).unwrap();

        let processing = make_doc("user-1", "b.pdf");
        insert_document(&conn, &processing).unwrap();
        update_status(&conn, &processing.id, &StatusPatch::processing("file-1")).unwrap();

        let failed = make_doc("user-1", "c.pdf");
        insert_document(&conn, &failed).unwrap();
        update_status(
            &conn,
            &failed.id,
            &StatusPatch::failed(DocumentStatus::Error, "boom"),
        )
        .unwrap();

        let backlog = get_backlog(&conn, None).unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, pending.id);
    }

    #[test]
    fn backlog_scopes_to_owner() {
        let conn = open_memory_database().unwrap();
        insert_document(&conn, &make_doc("user-1", "a.pdf")).unwrap();
        insert_document(&conn, &make_doc("user-2", "b.pdf")).unwrap();

        let backlog = get_backlog(&conn, Some("user-2")).unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].owner_id, "user-2");
    }

    #[test]
    fn update_status_applies_partial_patch() {
        let conn = open_memory_database().unwrap();
        let doc = make_doc("user-1", "a.pdf");
        insert_document(&conn, &doc).unwrap();

        update_status(&conn, &doc.id, &StatusPatch::processing("file-9")).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Processing);
        assert_eq!(loaded.provider_file_handle.as_deref(), Some("file-9"));
        // Untouched fields survive
        assert_eq!(loaded.filename, "a.pdf");
        assert!(loaded.obligations.is_none());
    }

    #[test]
    fn update_status_persists_obligations_json() {
        let conn = open_memory_database().unwrap();
        let doc = make_doc("user-1", "a.pdf");
        insert_document(&conn, &doc).unwrap();
        update_status(&conn, &doc.id, &StatusPatch::processing("file-9")).unwrap();

        let obligations = vec![
            Obligation::new("Pay the fee").with_section("4.2").with_due_date("2024-03-01"),
            Obligation::new("Deliver source code"),
        ];
        update_status(&conn, &doc.id, &StatusPatch::analyzed(obligations.clone())).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Analyzed);
        assert_eq!(loaded.obligations, Some(obligations));
    }

    #[test]
    fn update_status_refreshes_updated_at() {
        let conn = open_memory_database().unwrap();
        let mut doc = make_doc("user-1", "a.pdf");
        // Backdate so the refresh is observable at second granularity
        doc.created_at = Utc::now() - chrono::Duration::hours(1);
        doc.updated_at = doc.created_at;
        insert_document(&conn, &doc).unwrap();

        update_status(&conn, &doc.id, &StatusPatch::processing("file-1")).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert!(loaded.updated_at > doc.updated_at);
    }

    #[test]
    fn update_status_unknown_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result = update_status(&conn, &Uuid::new_v4(), &StatusPatch::processing("h"));
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn update_status_rejects_empty_patch() {
        let conn = open_memory_database().unwrap();
        let doc = make_doc("user-1", "a.pdf");
        insert_document(&conn, &doc).unwrap();
        let result = update_status(&conn, &doc.id, &StatusPatch::default());
        assert!(result.is_err());
    }

    #[test]
    fn list_documents_orders_by_creation() {
        let conn = open_memory_database().unwrap();
        let mut older = make_doc("user-1", "old.pdf");
        older.created_at = Utc::now() - chrono::Duration::minutes(30);
        older.updated_at = older.created_at;
        let newer = make_doc("user-1", "new.pdf");
        // Insert out of order
        insert_document(&conn, &newer).unwrap();
        insert_document(&conn, &older).unwrap();

        let all = list_documents(&conn, &DocumentFilter::new()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].filename, "old.pdf");
        assert_eq!(all[1].filename, "new.pdf");
    }
}
