//! Batch-level result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::DocumentStatus;

/// Per-document outcome of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub document_id: Uuid,
    pub final_status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running a full pipeline batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub processed: u32,
    pub failed: u32,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            processed: 0,
            failed: 0,
            duration_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_outcomes() {
        let report = BatchReport::empty();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn outcome_serde_skips_absent_error() {
        let outcome = DocumentOutcome {
            document_id: Uuid::new_v4(),
            final_status: DocumentStatus::Analyzed,
            error: None,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"analyzed\""));
        assert!(!json.contains("error"));
    }
}
