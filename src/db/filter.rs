//! Structured document filters.
//!
//! Filters are an explicit predicate list compiled once into a SQL
//! conjunction. Any number of predicates chain with AND; columns come from a
//! closed enum, values are always bound as parameters.

use rusqlite::types::Value;

use crate::models::DocumentStatus;

/// Filterable columns of the documents table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentField {
    Id,
    OwnerId,
    Status,
    ProviderFileHandle,
    Party,
}

impl DocumentField {
    fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::OwnerId => "owner_id",
            Self::Status => "status",
            Self::ProviderFileHandle => "provider_file_handle",
            Self::Party => "party",
        }
    }
}

/// One predicate: a field, an operator, and (for comparisons) a bound value.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq(DocumentField, Value),
    Ne(DocumentField, Value),
    IsNull(DocumentField),
    IsNotNull(DocumentField),
}

impl Predicate {
    pub fn eq(field: DocumentField, value: impl Into<String>) -> Self {
        Self::Eq(field, Value::Text(value.into()))
    }

    pub fn status_eq(status: DocumentStatus) -> Self {
        Self::Eq(DocumentField::Status, Value::Text(status.as_str().to_string()))
    }
}

/// Conjunction of predicates over the documents table.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    predicates: Vec<Predicate>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Compile the predicate list into a WHERE clause and its bound
    /// parameters. Empty filter compiles to an empty clause.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        if self.predicates.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut clauses: Vec<String> = Vec::with_capacity(self.predicates.len());
        let mut params: Vec<Value> = Vec::new();

        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq(field, value) => {
                    params.push(value.clone());
                    clauses.push(format!("{} = ?{}", field.column(), params.len()));
                }
                Predicate::Ne(field, value) => {
                    params.push(value.clone());
                    clauses.push(format!("{} != ?{}", field.column(), params.len()));
                }
                Predicate::IsNull(field) => {
                    clauses.push(format!("{} IS NULL", field.column()));
                }
                Predicate::IsNotNull(field) => {
                    clauses.push(format!("{} IS NOT NULL", field.column()));
                }
            }
        }

        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

/// The pipeline backlog: pending documents the uploader has not touched.
pub fn backlog_filter(owner_id: Option<&str>) -> DocumentFilter {
    let mut filter = DocumentFilter::new()
        .with(Predicate::status_eq(DocumentStatus::Pending))
        .with(Predicate::IsNull(DocumentField::ProviderFileHandle));
    if let Some(owner) = owner_id {
        filter = filter.with(Predicate::eq(DocumentField::OwnerId, owner));
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_compiles_to_no_clause() {
        let (sql, params) = DocumentFilter::new().to_sql();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn single_predicate() {
        let (sql, params) = DocumentFilter::new()
            .with(Predicate::eq(DocumentField::OwnerId, "user-1"))
            .to_sql();
        assert_eq!(sql, " WHERE owner_id = ?1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn compound_filter_chains_every_predicate() {
        // The whole point of the predicate list: three conditions, three clauses.
        let (sql, params) = backlog_filter(Some("user-1")).to_sql();
        assert_eq!(
            sql,
            " WHERE status = ?1 AND provider_file_handle IS NULL AND owner_id = ?2"
        );
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], Value::Text("pending".into()));
        assert_eq!(params[1], Value::Text("user-1".into()));
    }

    #[test]
    fn values_are_bound_not_inlined() {
        let hostile = "x' OR '1'='1";
        let (sql, params) = DocumentFilter::new()
            .with(Predicate::eq(DocumentField::Party, hostile))
            .to_sql();
        assert!(!sql.contains(hostile));
        assert_eq!(params[0], Value::Text(hostile.into()));
    }

    #[test]
    fn is_not_null_renders_without_param() {
        let (sql, params) = DocumentFilter::new()
            .with(Predicate::IsNotNull(DocumentField::ProviderFileHandle))
            .to_sql();
        assert_eq!(sql, " WHERE provider_file_handle IS NOT NULL");
        assert!(params.is_empty());
    }
}
