//! Schema-related data models.
//!
//! These back the MCP resources exposed for the default target's tables.

use serde::{Deserialize, Serialize};

/// Column layout of one table, returned when a table resource is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableLayout {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
}

impl TableLayout {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        if column.is_primary_key {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    /// `database.table`, the form used in resource names.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Full MySQL column type, e.g. `varchar(255)` or `int unsigned`
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// e.g., "auto_increment", "on update CURRENT_TIMESTAMP"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            is_primary_key: false,
            default_value: None,
            extra: None,
            comment: None,
        }
    }

    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Split a `database.table` resource name.
///
/// Only the first dot separates the parts; table names may not contain dots
/// in MySQL without quoting, but database names never do.
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    let (database, table) = name.split_once('.')?;
    if database.is_empty() || table.is_empty() {
        return None;
    }
    Some((database, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_collects_primary_key() {
        let layout = TableLayout::new("shop", "orders")
            .with_column(ColumnDefinition::new("id", "bigint", false).with_primary_key(true))
            .with_column(ColumnDefinition::new("note", "text", true));
        assert_eq!(layout.primary_key, vec!["id"]);
        assert_eq!(layout.qualified_name(), "shop.orders");
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let json = serde_json::to_value(ColumnDefinition::new("a", "int", true)).unwrap();
        assert!(json.get("default_value").is_none());
        assert!(json.get("comment").is_none());
    }

    #[test]
    fn test_split_qualified_name() {
        assert_eq!(split_qualified_name("shop.orders"), Some(("shop", "orders")));
        assert_eq!(split_qualified_name("orders"), None);
        assert_eq!(split_qualified_name(".orders"), None);
        assert_eq!(split_qualified_name("shop."), None);
    }
}
