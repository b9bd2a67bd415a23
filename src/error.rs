//! Error types for the multi-target MySQL MCP server.
//!
//! All error kinds are defined with `thiserror`. Each variant carries enough
//! context for an AI assistant to correct its next call: unknown targets list
//! the configured names, rejected commands list the allow-list, connection
//! failures carry a remediation hint.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Configuration source unreadable, malformed, or empty.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown database target '{target}'. Available targets: {}", format_list(.available))]
    UnknownTarget {
        target: String,
        available: Vec<String>,
    },

    /// Pool creation failed after the reload-and-retry attempt.
    #[error("Failed to connect to target '{target}': {message}")]
    ConnectionFailed {
        target: String,
        message: String,
        suggestion: String,
    },

    /// A live connection failed while a statement was running.
    #[error("Connection error: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Command not allowed: '{command}'. Allowed commands: {}", format_list(.allowed))]
    CommandRejected {
        command: String,
        allowed: Vec<String>,
    },

    #[error("Missing required parameter: {parameter}")]
    MissingParameter { parameter: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown target error carrying the currently configured names.
    pub fn unknown_target(target: impl Into<String>, available: Vec<String>) -> Self {
        Self::UnknownTarget {
            target: target.into(),
            available,
        }
    }

    /// Create a pool-creation failure with a remediation hint.
    pub fn connection_failed(
        target: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::ConnectionFailed {
            target: target.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a rejected command error carrying the full allow-list.
    pub fn command_rejected(command: impl Into<String>, allowed: Vec<String>) -> Self {
        Self::CommandRejected {
            command: command.into(),
            allowed,
        }
    }

    /// Create a missing parameter error.
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::UnknownTarget { .. } => {
                Some("Call list_databases to see the configured target names")
            }
            Self::MissingParameter { .. } => {
                Some("Provide the parameter explicitly; no default target is assumed")
            }
            _ => None,
        }
    }
}

/// Convert sqlx errors raised while running statements.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the target's host, user and database settings",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The server is shutting down; retry after restart",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::MissingParameter { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }
            DbError::CommandRejected { allowed, .. } => rmcp::ErrorData::invalid_params(
                err.to_string(),
                Some(serde_json::json!({
                    "allowed_commands": allowed,
                    "suggestion": "Rewrite the statement to start with one of the allowed commands",
                })),
            ),

            DbError::UnknownTarget { available, .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                Some(serde_json::json!({
                    "available_targets": available,
                    "suggestion": err.suggestion(),
                })),
            ),

            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            DbError::ConnectionFailed { suggestion, .. } | DbError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }
            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some("Consider narrowing the query or raising --query-timeout")),
            ),

            DbError::Configuration { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), None)
            }
        }
    }
}
