//! Optional parser-based check that SQL holds exactly one statement.
//!
//! Layered after the lexical [`CommandGate`](super::gate::CommandGate) when
//! `--single-statement` is set. Parsing with the MySQL dialect closes the
//! stacked-statement gap of the prefix classifier, at the cost of refusing
//! valid MySQL that `sqlparser` does not understand.

use crate::error::{DbError, DbResult};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGuard;

impl StatementGuard {
    pub fn new() -> Self {
        Self
    }

    /// Reject `sql` unless it parses to exactly one statement.
    pub fn check(&self, sql: &str) -> DbResult<()> {
        let statements = Parser::parse_sql(&MySqlDialect {}, sql).map_err(|e| {
            DbError::invalid_input(format!(
                "Failed to parse SQL statement: {}. Single-statement mode only runs SQL it can parse.",
                e
            ))
        })?;

        match statements.len() {
            0 => Err(DbError::invalid_input("Empty SQL statement")),
            1 => Ok(()),
            n => Err(DbError::invalid_input(format!(
                "Expected a single SQL statement, found {}. Send each statement in its own call.",
                n
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement_allowed() {
        let guard = StatementGuard::new();
        assert!(guard.check("SELECT * FROM users WHERE id = 1").is_ok());
        assert!(guard.check("SELECT 1;").is_ok());
    }

    #[test]
    fn test_stacked_statements_rejected() {
        let err = StatementGuard::new()
            .check("SELECT 1; DROP TABLE users")
            .unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_unparseable_rejected() {
        assert!(matches!(
            StatementGuard::new().check("SELEC FROM"),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(StatementGuard::new().check("  ").is_err());
    }
}
