//! Configuration handling for the MCP server.
//!
//! Process-level settings come from CLI arguments and environment variables.
//! Database targets and the security level live in a separate configuration
//! source (see [`crate::db::source`]) so that targets can be reloaded without
//! restarting the process.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_DATABASES_KEY: &str = "MYSQL_DATABASES";
pub const DEFAULT_SECURITY_LEVEL_KEY: &str = "MYSQL_SECURITY_LEVEL";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ROWS: u32 = 1000;
pub const MAX_ROW_LIMIT: u32 = 10000;

// Pool configuration defaults
pub const DEFAULT_CONNECTION_LIMIT: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
/// Acquire timeout used when a target sets `waitForConnections: false`.
pub const NO_WAIT_ACQUIRE_TIMEOUT_SECS: u64 = 1;

/// Configuration for the MCP server process.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multi-mysql-mcp",
    about = "MCP server for multiple named MySQL targets with a command allow-list",
    version,
    author
)]
pub struct Config {
    /// Dotenv file re-read on every configuration reload.
    /// Keys missing from the file fall back to the process environment.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ENV_FILE, env = "MCP_ENV_FILE")]
    pub env_file: PathBuf,

    /// Key holding the JSON array of database targets
    #[arg(long, default_value = DEFAULT_DATABASES_KEY, env = "MCP_DATABASES_KEY")]
    pub databases_key: String,

    /// Key holding the security level (default, extended, all, or a comma-separated list)
    #[arg(
        long,
        default_value = DEFAULT_SECURITY_LEVEL_KEY,
        env = "MCP_SECURITY_LEVEL_KEY"
    )]
    pub security_level_key: String,

    /// Reject SQL containing more than one statement (parser-based, in addition to the allow-list)
    #[arg(long, env = "MCP_SINGLE_STATEMENT")]
    pub single_statement: bool,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Seconds an idle pooled connection is kept before being closed (0 keeps them indefinitely)
    #[arg(
        long,
        default_value_t = DEFAULT_IDLE_TIMEOUT_SECS,
        env = "MCP_IDLE_TIMEOUT"
    )]
    pub idle_timeout: u64,

    /// Maximum rows returned per query (capped at 10000)
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS, env = "MCP_MAX_ROWS")]
    pub max_rows: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            databases_key: DEFAULT_DATABASES_KEY.to_string(),
            security_level_key: DEFAULT_SECURITY_LEVEL_KEY.to_string(),
            single_statement: false,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_SECS,
            max_rows: DEFAULT_MAX_ROWS,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Idle connection timeout for every pool; `None` when disabled.
    pub fn idle_timeout_duration(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }

    /// Row limit clamped to `[1, MAX_ROW_LIMIT]`.
    pub fn effective_max_rows(&self) -> u32 {
        self.max_rows.clamp(1, MAX_ROW_LIMIT)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.databases_key, "MYSQL_DATABASES");
        assert_eq!(config.security_level_key, "MYSQL_SECURITY_LEVEL");
        assert!(!config.single_statement);
        assert!(!config.enable_logs);
    }

    #[test]
    fn test_parse_args() {
        let config = Config::parse_from([
            "multi-mysql-mcp",
            "--env-file",
            "/etc/mcp/mysql.env",
            "--single-statement",
            "--max-rows",
            "50",
        ]);
        assert_eq!(config.env_file, PathBuf::from("/etc/mcp/mysql.env"));
        assert!(config.single_statement);
        assert_eq!(config.max_rows, 50);
    }

    #[test]
    fn test_effective_max_rows_is_clamped() {
        let config = Config {
            max_rows: 99999,
            ..Config::default()
        };
        assert_eq!(config.effective_max_rows(), MAX_ROW_LIMIT);

        let config = Config {
            max_rows: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_max_rows(), 1);
    }

    #[test]
    fn test_timeout_duration() {
        let config = Config {
            query_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_idle_timeout_duration() {
        assert_eq!(
            Config::default().idle_timeout_duration(),
            Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS))
        );

        let config = Config::parse_from(["multi-mysql-mcp", "--idle-timeout", "0"]);
        assert_eq!(config.idle_timeout_duration(), None);

        let config = Config::parse_from(["multi-mysql-mcp", "--idle-timeout", "45"]);
        assert_eq!(config.idle_timeout_duration(), Some(Duration::from_secs(45)));
    }
}
