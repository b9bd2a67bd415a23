//! Schema and target listing tools.
//!
//! Implements `describe_table` and `list_databases`, plus the table lookups
//! behind the MCP resources of the default target.

use crate::db::{MySqlRegistry, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{TableLayout, TargetSummary, split_qualified_name};
use crate::tools::required;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// URI scheme of table resources: `mysql://<target>/<database>.<table>`.
pub const RESOURCE_SCHEME: &str = "mysql://";

/// Input for the describe_table tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Target name from list_databases. Required; there is no default target.
    #[serde(default)]
    pub database: Option<String>,
    /// Table name, optionally qualified as `schema.table`
    #[serde(default)]
    pub table: Option<String>,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub database: String,
    pub table: String,
    /// `SHOW CREATE TABLE` output as returned by the server
    pub create_statement: String,
}

/// Output from the list_databases tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    /// Configured targets in configuration order
    pub targets: Vec<TargetSummary>,
    pub count: usize,
    /// First configured target; used only for resource listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
}

/// A table exposed as an MCP resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResource {
    pub uri: String,
    /// `database.table`
    pub name: String,
}

/// Handler for schema tools.
pub struct SchemaToolHandler {
    registry: Arc<MySqlRegistry>,
    executor: QueryExecutor,
}

impl SchemaToolHandler {
    pub fn new(registry: Arc<MySqlRegistry>, executor: QueryExecutor) -> Self {
        Self { registry, executor }
    }

    /// Handle the describe_table tool call.
    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let database = required(input.database.as_deref(), "database")?;
        let table = required(input.table.as_deref(), "table")?;

        let pool = self.registry.resolve(database).await?;
        let create_statement =
            SchemaInspector::show_create_table(&self.executor, &pool, table).await?;

        Ok(DescribeTableOutput {
            database: database.to_string(),
            table: table.to_string(),
            create_statement,
        })
    }

    /// Handle the list_databases tool call.
    ///
    /// Reports the store as it is; no reload and no connection attempt.
    pub async fn list_databases(&self) -> ListDatabasesOutput {
        let config = self.registry.config();
        let default_target = config.default_target();
        let mut targets = Vec::new();
        for target in config.targets() {
            let pool_active = self.registry.is_materialized(&target.name).await;
            let is_default = default_target.as_deref() == Some(target.name.as_str());
            targets.push(TargetSummary::new(&target, pool_active, is_default));
        }

        ListDatabasesOutput {
            count: targets.len(),
            targets,
            default_target,
        }
    }

    /// Tables of the default target's database.
    pub async fn list_table_resources(&self) -> DbResult<Vec<TableResource>> {
        let config = self.registry.config();
        let Some(default_name) = config.default_target() else {
            return Ok(Vec::new());
        };
        let target = config
            .get(&default_name)
            .ok_or_else(|| DbError::unknown_target(&default_name, config.names()))?;

        let pool = self.registry.resolve(&default_name).await?;
        let tables = SchemaInspector::list_tables(&pool, &target.database).await?;
        debug!(db_target = %default_name, count = tables.len(), "Listed table resources");

        Ok(tables
            .into_iter()
            .map(|name| TableResource {
                uri: resource_uri(&default_name, &name),
                name,
            })
            .collect())
    }

    /// Column layout behind a table resource URI.
    pub async fn read_table_resource(&self, uri: &str) -> DbResult<TableLayout> {
        let (target, database, table) = parse_resource_uri(uri)?;
        let pool = self.registry.resolve(target).await?;
        SchemaInspector::table_layout(&pool, database, table).await
    }
}

pub fn resource_uri(target: &str, qualified_table: &str) -> String {
    format!("{}{}/{}", RESOURCE_SCHEME, target, qualified_table)
}

/// Split `mysql://<target>/<database>.<table>` into its parts.
pub fn parse_resource_uri(uri: &str) -> DbResult<(&str, &str, &str)> {
    let invalid = || {
        DbError::invalid_input(format!(
            "Invalid resource URI '{}': expected {}<target>/<database>.<table>",
            uri, RESOURCE_SCHEME
        ))
    };
    let rest = uri.strip_prefix(RESOURCE_SCHEME).ok_or_else(invalid)?;
    let (target, qualified) = rest.split_once('/').ok_or_else(invalid)?;
    if target.is_empty() {
        return Err(invalid());
    }
    let (database, table) = split_qualified_name(qualified).ok_or_else(invalid)?;
    Ok((target, database, table))
}
