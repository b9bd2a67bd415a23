//! MySQL pool creation for configured targets.

use crate::config::{DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MIN_CONNECTIONS};
use crate::db::registry::{PoolConnector, PoolRegistry};
use crate::error::{DbError, DbResult};
use crate::models::DatabaseTarget;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, warn};

/// Registry of MySQL pools used by the server.
pub type MySqlRegistry = PoolRegistry<MySqlConnector>;

/// Opens `sqlx` MySQL pools from target descriptors.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    idle_timeout: Option<Duration>,
}

impl MySqlConnector {
    pub fn new() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
        }
    }

    /// Override how long an idle connection is kept before being closed.
    ///
    /// `None` keeps idle connections until the pool is closed.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn connect_options(target: &DatabaseTarget) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.user)
            .password(&target.password)
            .database(&target.database)
            .charset("utf8mb4")
    }

    fn pool_options(&self, target: &DatabaseTarget) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .min_connections(DEFAULT_MIN_CONNECTIONS.min(target.connection_limit))
            .max_connections(target.connection_limit)
            .acquire_timeout(target.acquire_timeout())
            .idle_timeout(self.idle_timeout)
            .test_before_acquire(true)
    }
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolConnector for MySqlConnector {
    type Pool = MySqlPool;

    async fn connect(&self, target: &DatabaseTarget) -> DbResult<MySqlPool> {
        debug!(
            db_target = %target.name,
            address = %target.display_address(),
            user = %target.user,
            "Connecting to MySQL"
        );

        // min_connections > 0 makes connect_with open a connection up front,
        // so bad credentials surface here rather than on the first query.
        self.pool_options(target)
            .connect_with(Self::connect_options(target))
            .await
            .map_err(|e| {
                warn!(db_target = %target.name, error = %e, "MySQL connection failed");
                DbError::connection_failed(
                    target.name.clone(),
                    e.to_string(),
                    connection_suggestion(&e),
                )
            })
    }

    async fn close(&self, pool: &MySqlPool) -> DbResult<()> {
        pool.close().await;
        Ok(())
    }
}

/// Generate a helpful suggestion for connection errors.
pub fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("access denied")
        || error_str.contains("authentication")
        || error_str.contains("password")
    {
        return "Verify the user and password configured for this target".to_string();
    }

    if error_str.contains("unknown database") || error_str.contains("does not exist") {
        return "Check that the database named in the target exists on the server".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration on the server".to_string();
    }

    if matches!(error, sqlx::Error::PoolTimedOut) {
        return "The server did not accept a connection in time; check host, port and firewall rules"
            .to_string();
    }

    "Verify the target's host, port, user, password and database".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(limit: u32, wait: bool) -> DatabaseTarget {
        DatabaseTarget {
            name: "main".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "app".to_string(),
            password: "pw".to_string(),
            database: "shop".to_string(),
            connection_limit: limit,
            wait_for_connections: wait,
        }
    }

    #[test]
    fn test_pool_options_follow_target() {
        let connector = MySqlConnector::new();
        let opts = connector.pool_options(&target(4, true));
        assert_eq!(opts.get_max_connections(), 4);
        assert_eq!(opts.get_min_connections(), 1);
        assert_eq!(opts.get_acquire_timeout(), Duration::from_secs(30));
        assert_eq!(opts.get_idle_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_no_wait_shortens_acquire_timeout() {
        let connector = MySqlConnector::new();
        let opts = connector.pool_options(&target(1, false));
        assert_eq!(opts.get_acquire_timeout(), Duration::from_secs(1));
        assert_eq!(opts.get_min_connections(), 1);
    }

    #[test]
    fn test_idle_timeout_override() {
        let connector = MySqlConnector::new().with_idle_timeout(Some(Duration::from_secs(45)));
        let opts = connector.pool_options(&target(2, true));
        assert_eq!(opts.get_idle_timeout(), Some(Duration::from_secs(45)));

        let connector = MySqlConnector::new().with_idle_timeout(None);
        assert_eq!(connector.pool_options(&target(2, true)).get_idle_timeout(), None);
    }

    #[test]
    fn test_connect_options_use_target_fields() {
        let opts = MySqlConnector::connect_options(&target(2, true));
        assert_eq!(opts.get_host(), "127.0.0.1");
        assert_eq!(opts.get_port(), 3306);
        assert_eq!(opts.get_username(), "app");
        assert_eq!(opts.get_database(), Some("shop"));
    }

    #[test]
    fn test_connection_suggestion_refused() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused",
        ));
        assert!(connection_suggestion(&err).contains("running"));
    }

    #[test]
    fn test_connection_suggestion_fallback() {
        let err = sqlx::Error::Protocol("weird".to_string());
        assert!(connection_suggestion(&err).contains("host"));
    }
}
