//! Query execution engine.
//!
//! This module provides query execution functionality with support for:
//! - Positional `?` parameters
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Query timeouts
//!
//! Statements without parameters are sent unprepared so that commands the
//! prepared-statement protocol rejects (some `SHOW` variants, `CREATE
//! PROCEDURE`) still run.

use crate::config::{DEFAULT_MAX_ROWS, DEFAULT_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT};
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, QueryResult};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use sqlx::mysql::{MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::{Either, Executor, MySqlPool};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Leading keywords of statements that produce a result set.
const ROW_RETURNING_COMMANDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    default_timeout: Duration,
    default_limit: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            default_limit: DEFAULT_MAX_ROWS,
        }
    }

    /// Create a new query executor with custom settings.
    pub fn with_defaults(timeout: Duration, row_limit: u32) -> Self {
        Self {
            default_timeout: timeout,
            default_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn row_limit(&self) -> u32 {
        self.default_limit
    }

    /// Run one statement and return its rows or affected-row count.
    pub async fn execute(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        decode_binary: bool,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = self.default_limit;

        debug!(
            sql = %sql,
            params = params.len(),
            limit = row_limit,
            timeout_secs = self.default_timeout.as_secs(),
            "Executing query"
        );

        let fetched = match timeout(
            self.default_timeout,
            fetch_limited(pool, sql, params, row_limit as usize + 1),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(timeout_error("query execution", self.default_timeout)),
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        if fetched.rows.is_empty() && !returns_rows(sql) {
            return Ok(QueryResult::write_result(
                fetched.rows_affected,
                execution_time_ms,
            ));
        }
        Ok(process_rows(
            fetched.rows,
            row_limit,
            execution_time_ms,
            decode_binary,
        ))
    }

    /// Run a statement expected to return a single text cell, e.g. `SHOW CREATE TABLE`.
    pub async fn fetch_text(&self, pool: &MySqlPool, sql: &str, column: usize) -> DbResult<String> {
        use sqlx::Row;

        let row = match timeout(self.default_timeout, pool.fetch_optional(sql)).await {
            Ok(result) => result?,
            Err(_) => return Err(timeout_error("query execution", self.default_timeout)),
        };
        let row = row.ok_or_else(|| {
            DbError::database("Statement returned no rows", None, "Check the object name")
        })?;

        // SHOW CREATE returns VARBINARY on some server versions
        match row.try_get::<String, _>(column) {
            Ok(text) => Ok(text),
            Err(_) => {
                let bytes: Vec<u8> = row.try_get(column)?;
                String::from_utf8(bytes)
                    .map_err(|e| DbError::internal(format!("Statement output is not UTF-8: {}", e)))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

struct Fetched {
    rows: Vec<MySqlRow>,
    rows_affected: u64,
}

/// Stream results until `fetch_limit` rows have arrived or the statement ends.
async fn fetch_limited(
    pool: &MySqlPool,
    sql: &str,
    params: &[QueryParam],
    fetch_limit: usize,
) -> DbResult<Fetched> {
    let mut stream: BoxStream<'_, Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>> =
        if params.is_empty() {
            pool.fetch_many(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            pool.fetch_many(query)
        };

    let mut fetched = Fetched {
        rows: Vec::new(),
        rows_affected: 0,
    };
    while let Some(item) = stream.next().await {
        match item? {
            Either::Left(result) => fetched.rows_affected += result.rows_affected(),
            Either::Right(row) => {
                fetched.rows.push(row);
                if fetched.rows.len() >= fetch_limit {
                    break;
                }
            }
        }
    }
    Ok(fetched)
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}

/// Convert fetched rows into a QueryResult, trimming the probe row.
fn process_rows(
    rows: Vec<MySqlRow>,
    row_limit: u32,
    execution_time_ms: u64,
    decode_binary: bool,
) -> QueryResult {
    let columns = rows
        .first()
        .map(|r| r.get_column_metadata())
        .unwrap_or_default();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_map_with_options(decode_binary))
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        rows_affected: None,
        truncated,
        execution_time_ms,
    }
}

/// Whether `sql` starts with a keyword that produces a result set.
fn returns_rows(sql: &str) -> bool {
    let first = sql
        .trim_start()
        .trim_start_matches('(')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();
    ROW_RETURNING_COMMANDS.contains(&first.as_str())
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs() as u32)
}
