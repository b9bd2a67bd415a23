//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Every statement passes the
//! command gate (and the single-statement guard when enabled) before a pool
//! is resolved, so a rejected statement never opens a connection.

use crate::db::{MySqlRegistry, QueryExecutor};
use crate::error::DbResult;
use crate::models::{ColumnMetadata, QueryParam, QueryResult};
use crate::tools::gate::CommandGate;
use crate::tools::required;
use crate::tools::statement_guard::StatementGuard;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Default value for decode_binary field.
fn default_decode_binary() -> bool {
    true
}

/// Input for the query tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// Target name from list_databases. Required; there is no default target.
    #[serde(default)]
    pub database: Option<String>,
    /// SQL statement to execute. Must start with a command allowed by the server's security level.
    #[serde(default)]
    pub sql: Option<String>,
    /// Positional parameters for `?` placeholders in the SQL
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// If true (default), try to decode binary columns as UTF-8 text first (fallback to base64). If false, always use base64 encoding.
    #[serde(default = "default_decode_binary")]
    pub decode_binary: bool,
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Target the statement ran against
    pub database: String,
    /// Allow-list command that permitted the statement; absent when unrestricted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMetadataOutput>,
    /// Result rows as key-value maps
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Affected rows for statements without a result set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    /// True if the result set was cut at the server's row limit
    pub truncated: bool,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnMetadataOutput {
    pub name: String,
    pub type_name: String,
}

impl From<ColumnMetadata> for ColumnMetadataOutput {
    fn from(meta: ColumnMetadata) -> Self {
        Self {
            name: meta.name,
            type_name: meta.type_name,
        }
    }
}

impl QueryOutput {
    pub fn from_result(
        database: impl Into<String>,
        matched_command: Option<String>,
        result: QueryResult,
    ) -> Self {
        Self {
            database: database.into(),
            matched_command,
            row_count: result.row_count(),
            columns: result.columns.into_iter().map(Into::into).collect(),
            rows: result.rows,
            rows_affected: result.rows_affected,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// Handler for the query tool.
pub struct QueryToolHandler {
    registry: Arc<MySqlRegistry>,
    gate: Arc<CommandGate>,
    guard: Option<StatementGuard>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(
        registry: Arc<MySqlRegistry>,
        gate: Arc<CommandGate>,
        guard: Option<StatementGuard>,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            registry,
            gate,
            guard,
            executor,
        }
    }

    /// Handle the query tool call.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        let database = required(input.database.as_deref(), "database")?;
        let sql = required(input.sql.as_deref(), "sql")?;

        let permit = self.gate.check(sql)?;
        if let Some(guard) = &self.guard {
            guard.check(sql)?;
        }

        let pool = self.registry.resolve(database).await?;
        let result = self
            .executor
            .execute(&pool, sql, &input.params, input.decode_binary)
            .await?;

        info!(
            db_target = %database,
            command = permit.matched.as_deref().unwrap_or("*"),
            rows = result.row_count(),
            rows_affected = ?result.rows_affected,
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );
        Ok(QueryOutput::from_result(database, permit.matched, result))
    }
}
