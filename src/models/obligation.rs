//! One extracted contractual duty.

use serde::{Deserialize, Serialize};

/// A single obligation extracted from a contract for the document's party.
///
/// `due_date` is kept as the raw string the model produced: it may be a
/// plain date, a full ISO datetime, or garbage. Consumers must validate
/// before interpreting it as a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, alias = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Original provider text, carried only by the placeholder fallback
    /// when the response could not be parsed. Diagnostics, not contract data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl Obligation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section: None,
            due_date: None,
            raw_response: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Section label for display: absent sections render as "N/A".
    pub fn section_label(&self) -> &str {
        self.section.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_skips_absent_optionals() {
        let ob = Obligation::new("Pay the license fee");
        let json = serde_json::to_string(&ob).unwrap();
        assert!(json.contains("Pay the license fee"));
        assert!(!json.contains("section"));
        assert!(!json.contains("due_date"));
        assert!(!json.contains("raw_response"));
    }

    #[test]
    fn deserializes_camel_case_due_date() {
        let ob: Obligation =
            serde_json::from_str(r#"{"text": "Deliver report", "dueDate": "2024-06-30"}"#).unwrap();
        assert_eq!(ob.due_date.as_deref(), Some("2024-06-30"));
    }

    #[test]
    fn deserializes_snake_case_due_date() {
        let ob: Obligation =
            serde_json::from_str(r#"{"text": "Deliver report", "due_date": "2024-06-30"}"#)
                .unwrap();
        assert_eq!(ob.due_date.as_deref(), Some("2024-06-30"));
    }

    #[test]
    fn section_label_defaults_to_na() {
        let ob = Obligation::new("Notify the counterparty");
        assert_eq!(ob.section_label(), "N/A");
        let ob = ob.with_section("12.3");
        assert_eq!(ob.section_label(), "12.3");
    }
}
