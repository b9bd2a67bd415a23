//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: Execute SQL allowed by the command gate
//! - `describe_table`: `SHOW CREATE TABLE` for one table
//! - `list_databases`: Configured targets and pool status
//! - `gate`: Command allow-list
//! - `statement_guard`: Optional single-statement check

pub mod gate;
pub mod query;
pub mod schema;
pub mod statement_guard;

pub use gate::{CommandGate, Permit, SecurityPolicy};
pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListDatabasesOutput, SchemaToolHandler,
    TableResource,
};
pub use statement_guard::StatementGuard;

use crate::error::{DbError, DbResult};

/// Trimmed value of a required tool argument.
///
/// Absent and blank values are both reported as missing; no default is
/// substituted.
pub(crate) fn required<'a>(value: Option<&'a str>, parameter: &str) -> DbResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DbError::missing_parameter(parameter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required(Some("  main "), "database").unwrap(), "main");
    }

    #[test]
    fn test_required_rejects_absent_and_blank() {
        assert!(matches!(
            required(None, "database"),
            Err(DbError::MissingParameter { .. })
        ));
        let err = required(Some("   "), "sql").unwrap_err();
        assert!(err.to_string().contains("sql"));
    }
}
