//! Query-related data models.
//!
//! This module defines types for SQL query parameters and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A positional parameter value for `?` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMetadata {
    pub name: String,
    /// MySQL type name (e.g., "BIGINT", "VARCHAR", "JSON")
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Set for statements that return no result set (INSERT, UPDATE, DDL...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a result for statements without a result set.
    pub fn write_result(rows_affected: u64, execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: Some(rows_affected),
            truncated: false,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
