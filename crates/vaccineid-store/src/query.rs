//! Predicate queries over documents
//!
//! A [`DocumentQuery`] is a conjunction of field equality filters. The Cosmos
//! backend renders it as a parameterized SQL query so filter values never
//! become part of the query text; the in-memory backend evaluates it directly.

use serde_json::{json, Value};

/// Conjunction of `field == value` filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    filters: Vec<(&'static str, Value)>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter on a top-level document field
    pub fn where_eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    pub fn filters(&self) -> &[(&'static str, Value)] {
        &self.filters
    }

    /// Whether a document satisfies every filter
    pub fn matches(&self, document: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| document.get(*field) == Some(value))
    }

    /// SQL text, e.g. `SELECT * FROM c WHERE c.surname = @surname`
    pub fn to_sql(&self) -> String {
        if self.filters.is_empty() {
            return "SELECT * FROM c".to_string();
        }

        let predicates: Vec<String> = self
            .filters
            .iter()
            .map(|(field, _)| format!("c.{field} = @{field}"))
            .collect();

        format!("SELECT * FROM c WHERE {}", predicates.join(" AND "))
    }

    /// Query request body in the SQL API's `application/query+json` shape
    pub fn to_request_body(&self) -> Value {
        let parameters: Vec<Value> = self
            .filters
            .iter()
            .map(|(field, value)| json!({ "name": format!("@{field}"), "value": value }))
            .collect();

        json!({
            "query": self.to_sql(),
            "parameters": parameters,
        })
    }
}
