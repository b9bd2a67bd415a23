//! Database target descriptors.
//!
//! A target is one named MySQL endpoint read from the configuration source.
//! Descriptors are immutable: a reload replaces them wholesale.

use crate::config::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CONNECTION_LIMIT, DEFAULT_MYSQL_PORT,
    NO_WAIT_ACQUIRE_TIMEOUT_SECS,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

fn default_connection_limit() -> u32 {
    DEFAULT_CONNECTION_LIMIT
}

fn default_true() -> bool {
    true
}

/// One named database endpoint, as written in the configuration source.
///
/// Field names follow the camelCase keys of the source JSON
/// (`connectionLimit`, `waitForConnections`).
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseTarget {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub database: String,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    #[serde(default = "default_true")]
    pub wait_for_connections: bool,
}

impl DatabaseTarget {
    /// Validate fields serde cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("target name cannot be empty".to_string());
        }
        if self.host.trim().is_empty() {
            return Err(format!("target '{}' has an empty host", self.name));
        }
        if self.connection_limit == 0 {
            return Err(format!(
                "target '{}': connectionLimit must be greater than 0",
                self.name
            ));
        }
        Ok(())
    }

    /// How long a caller waits for a free connection before failing.
    pub fn acquire_timeout(&self) -> Duration {
        if self.wait_for_connections {
            Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
        } else {
            Duration::from_secs(NO_WAIT_ACQUIRE_TIMEOUT_SECS)
        }
    }

    /// `host:port/database` without credentials, for logs and listings.
    pub fn display_address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .field("connection_limit", &self.connection_limit)
            .field("wait_for_connections", &self.wait_for_connections)
            .finish()
    }
}

/// Target information returned by list_databases (no secrets exposed).
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TargetSummary {
    /// Target name. Use this value in the `database` parameter of every tool call.
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Schema the target connects to.
    pub database: String,
    pub user: String,
    pub connection_limit: u32,
    /// True once a connection pool has been created for this target.
    pub pool_active: bool,
    /// True for the first configured target, used for resource listing.
    pub is_default: bool,
}

impl TargetSummary {
    pub fn new(target: &DatabaseTarget, pool_active: bool, is_default: bool) -> Self {
        Self {
            name: target.name.clone(),
            host: target.host.clone(),
            port: target.port,
            database: target.database.clone(),
            user: target.user.clone(),
            connection_limit: target.connection_limit,
            pool_active,
            is_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatabaseTarget {
        serde_json::from_str(
            r#"{"name":"main","host":"db1","user":"app","password":"s3cret","database":"shop"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let target = sample();
        assert_eq!(target.port, 3306);
        assert_eq!(target.connection_limit, 10);
        assert!(target.wait_for_connections);
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_camel_case_pool_fields() {
        let target: DatabaseTarget = serde_json::from_str(
            r#"{"name":"a","host":"h","user":"u","password":"p","database":"d",
                "connectionLimit":3,"waitForConnections":false,"port":3307}"#,
        )
        .unwrap();
        assert_eq!(target.connection_limit, 3);
        assert!(!target.wait_for_connections);
        assert_eq!(target.port, 3307);
        assert_eq!(target.acquire_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let result: Result<DatabaseTarget, _> =
            serde_json::from_str(r#"{"name":"a","host":"h","user":"u","database":"d"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_masks_password() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_validate_rejects_blank_name_and_zero_limit() {
        let mut target = sample();
        target.name = "  ".to_string();
        assert!(target.validate().is_err());

        let mut target = sample();
        target.connection_limit = 0;
        assert!(target.validate().unwrap_err().contains("connectionLimit"));
    }

    #[test]
    fn test_summary_has_no_password() {
        let summary = TargetSummary::new(&sample(), false, true);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(json.contains("\"is_default\":true"));
    }
}
