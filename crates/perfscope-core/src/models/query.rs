//! Query catalog and result table models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, reusable query as listed by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Stable key, assigned by the service
    pub id: String,
    /// Display name
    pub name: String,
    /// Query text
    pub sql: String,
    /// Built-in queries cannot be edited or deleted
    #[serde(default)]
    pub builtin: bool,
}

impl QueryDefinition {
    /// Label for selectors: the name, or the id with underscores spaced out
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            self.id.replace('_', " ")
        } else {
            self.name.clone()
        }
    }
}

/// Payload for a user-defined query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuery {
    pub name: String,
    pub sql: String,
}

/// Tabular result of a query job
///
/// Rows are kept in server order and cells stay opaque JSON scalars,
/// aligned positionally with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Build a result from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Whether the query produced no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column headers as displayed: underscores become spaces, upper-cased
    pub fn header_labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.replace('_', " ").to_uppercase())
            .collect()
    }

    /// Rows with every cell converted to display text
    ///
    /// Short rows are padded so each line has one cell per column.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(display_cell).collect();
                if cells.len() < self.columns.len() {
                    cells.resize(self.columns.len(), String::new());
                }
                cells
            })
            .collect()
    }
}

/// String conversion of a scalar cell, without any type coercion
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
