//! Schema introspection for MySQL targets.
//!
//! SQL templates live in the `queries` submodule. `information_schema`
//! columns are converted to utf8 because some server configurations return
//! them as VARBINARY.

use crate::db::executor::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, TableLayout};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE IN ('BASE TABLE', 'VIEW')
        ORDER BY TABLE_NAME
        "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY,
            CONVERT(EXTRA USING utf8) AS EXTRA,
            CONVERT(COLUMN_COMMENT USING utf8) AS COLUMN_COMMENT
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;
}

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List tables and views of `database` as `database.table` names.
    pub async fn list_tables(pool: &MySqlPool, database: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .bind(database)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .map(|name| format!("{}.{}", database, name))
            .collect();

        debug!(database = %database, count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    /// Column layout of `database.table`.
    pub async fn table_layout(
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<TableLayout> {
        let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
            .bind(database)
            .bind(table)
            .fetch_all(pool)
            .await?;

        if rows.is_empty() {
            return Err(DbError::database(
                format!("Table '{}.{}' not found", database, table),
                Some("42S02".to_string()),
                "List the resources to see the available tables",
            ));
        }

        Ok(rows
            .iter()
            .map(column_from_row)
            .fold(TableLayout::new(database, table), TableLayout::with_column))
    }

    /// Full `CREATE TABLE` statement for `table` as the server reports it.
    pub async fn show_create_table(
        executor: &QueryExecutor,
        pool: &MySqlPool,
        table: &str,
    ) -> DbResult<String> {
        let sql = format!("SHOW CREATE TABLE {}", quote_identifier(table)?);
        // Second column holds the statement; the first echoes the name.
        executor.fetch_text(pool, &sql, 1).await
    }
}

/// Quote a table reference with backticks.
///
/// `db.table` is quoted per part. Embedded backticks are doubled.
pub fn quote_identifier(name: &str) -> DbResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::missing_parameter("table"));
    }
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(DbError::invalid_input(format!(
            "Invalid table name '{}': expected 'table' or 'database.table'",
            name
        )));
    }
    Ok(parts
        .iter()
        .map(|p| format!("`{}`", p.trim_matches('`').replace('`', "``")))
        .collect::<Vec<_>>()
        .join("."))
}

fn column_from_row(row: &MySqlRow) -> ColumnDefinition {
    let name = get_string(row, "COLUMN_NAME");
    let column_type = get_string(row, "COLUMN_TYPE");
    let nullable = get_string(row, "IS_NULLABLE") == "YES";
    let is_pk = get_string(row, "COLUMN_KEY") == "PRI";

    let mut col = ColumnDefinition::new(name, column_type, nullable).with_primary_key(is_pk);
    if let Some(def) = get_optional_string(row, "COLUMN_DEFAULT") {
        col = col.with_default(def);
    }
    if let Some(extra) = get_optional_string(row, "EXTRA").filter(|e| !e.is_empty()) {
        col = col.with_extra(extra);
    }
    if let Some(comment) = get_optional_string(row, "COLUMN_COMMENT").filter(|c| !c.is_empty()) {
        col = col.with_comment(comment);
    }
    col
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain_table() {
        assert_eq!(quote_identifier("users").unwrap(), "`users`");
    }

    #[test]
    fn test_quote_qualified_table() {
        assert_eq!(quote_identifier("shop.users").unwrap(), "`shop`.`users`");
    }

    #[test]
    fn test_quote_doubles_backticks() {
        assert_eq!(quote_identifier("we`ird").unwrap(), "`we``ird`");
    }

    #[test]
    fn test_quote_strips_existing_quotes() {
        assert_eq!(quote_identifier("`users`").unwrap(), "`users`");
    }

    #[test]
    fn test_quote_rejects_injection_shapes() {
        assert!(quote_identifier("users; DROP TABLE x").unwrap().starts_with('`'));
        assert!(quote_identifier("a.b.c").is_err());
        assert!(matches!(
            quote_identifier("  "),
            Err(DbError::MissingParameter { .. })
        ));
    }
}
