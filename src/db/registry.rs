//! Lazily materialized connection pools keyed by target name.
//!
//! # Design Decisions
//!
//! - **`OnceCell` per target name**: single-flight pool creation. Concurrent
//!   callers resolving the same name coalesce onto one in-flight creation;
//!   different names never wait on each other beyond the brief map lock.
//! - **Entries are never evicted**: a pool lives from its first successful
//!   creation until [`PoolRegistry::shutdown_all`]. A configuration reload
//!   does not rebuild pools that already exist.
//! - **Bounded recovery**: a call to [`PoolRegistry::resolve`] reloads the
//!   configuration at most once, either because the name is unknown or
//!   because pool creation failed, and retries creation at most once.
//!
//! # Concurrency Safety
//!
//! - No lock is held across pool creation or pool close; the map lock only
//!   guards insertion of the per-name cell.
//! - Shutdown drains the map under the write lock and closes outside it.
//! - Shutdown racing with in-flight `resolve` calls is the caller's concern:
//!   the transport stops serving requests before calling `shutdown_all`.

use crate::db::config_store::ConfigStore;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseTarget;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

/// Creates and closes pools for one kind of database backend.
///
/// The registry only needs a cloneable handle; what the handle wraps is up to
/// the connector.
pub trait PoolConnector: Send + Sync + 'static {
    type Pool: Clone + Send + Sync + 'static;

    /// Open a pool against `target`.
    fn connect(
        &self,
        target: &DatabaseTarget,
    ) -> impl Future<Output = DbResult<Self::Pool>> + Send;

    /// Close `pool`, waiting for checked-out connections to be returned.
    fn close(&self, pool: &Self::Pool) -> impl Future<Output = DbResult<()>> + Send;
}

/// Outcome of [`PoolRegistry::shutdown_all`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Names whose pools closed cleanly.
    pub closed: Vec<String>,
    pub failures: Vec<(String, DbError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PoolRegistry<C: PoolConnector> {
    config: Arc<ConfigStore>,
    connector: C,
    pools: RwLock<HashMap<String, Arc<OnceCell<C::Pool>>>>,
}

impl<C: PoolConnector> PoolRegistry<C> {
    pub fn new(config: Arc<ConfigStore>, connector: C) -> Self {
        Self {
            config,
            connector,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Return the pool for `name`, creating it on first use.
    ///
    /// An existing pool is returned without any I/O. Otherwise the descriptor
    /// is looked up, reloading the configuration once if the name is unknown
    /// or if the first creation attempt fails.
    ///
    /// The reload for an unknown name is the call's only reload: if the
    /// target it finds then fails to connect, `ConnectionFailed` is returned
    /// without a second reload or retry.
    pub async fn resolve(&self, name: &str) -> DbResult<C::Pool> {
        if let Some(pool) = self.cached(name).await {
            return Ok(pool);
        }

        let mut reloaded = false;
        let target = match self.config.get(name) {
            Some(target) => target,
            None => {
                self.reload(name, "unknown target").await;
                reloaded = true;
                self.lookup_after_reload(name)?
            }
        };

        let err = match self.materialize(&target).await {
            Ok(pool) => return Ok(pool),
            Err(e) => e,
        };

        if reloaded {
            return Err(self.creation_failed(name, err));
        }

        warn!(db_target = %name, error = %err, "Pool creation failed, reloading configuration and retrying");
        self.reload(name, "pool creation failed").await;
        let target = self.lookup_after_reload(name)?;

        self.materialize(&target)
            .await
            .map_err(|e| self.creation_failed(name, e))
    }

    /// Check whether a pool has been created for `name`.
    pub async fn is_materialized(&self, name: &str) -> bool {
        let pools = self.pools.read().await;
        pools.get(name).is_some_and(|cell| cell.initialized())
    }

    /// Names with a live pool.
    pub async fn materialized_names(&self) -> Vec<String> {
        let pools = self.pools.read().await;
        pools
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Get the number of created pools.
    pub async fn pool_count(&self) -> usize {
        let pools = self.pools.read().await;
        pools.values().filter(|cell| cell.initialized()).count()
    }

    /// Close every pool, continuing past individual close failures.
    ///
    /// Leaves the registry empty, so a second call is a no-op.
    pub async fn shutdown_all(&self) -> ShutdownReport {
        // Drain pools under lock, close outside lock
        let drained: Vec<_> = {
            let mut pools = self.pools.write().await;
            pools.drain().collect()
        };

        let mut report = ShutdownReport::default();
        for (name, cell) in drained {
            let Some(pool) = cell.get() else {
                continue;
            };
            info!(db_target = %name, "Closing connection pool");
            match self.connector.close(pool).await {
                Ok(()) => report.closed.push(name),
                Err(e) => {
                    warn!(db_target = %name, error = %e, "Failed to close connection pool");
                    report.failures.push((name, e));
                }
            }
        }

        info!(
            closed = report.closed.len(),
            failed = report.failures.len(),
            "Connection pools shut down"
        );
        report
    }

    async fn cached(&self, name: &str) -> Option<C::Pool> {
        let pools = self.pools.read().await;
        pools.get(name).and_then(|cell| cell.get().cloned())
    }

    async fn cell_for(&self, name: &str) -> Arc<OnceCell<C::Pool>> {
        {
            let pools = self.pools.read().await;
            if let Some(cell) = pools.get(name) {
                return Arc::clone(cell);
            }
        }
        let mut pools = self.pools.write().await;
        // Double-check after acquiring write lock
        Arc::clone(
            pools
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    async fn materialize(&self, target: &DatabaseTarget) -> DbResult<C::Pool> {
        let cell = self.cell_for(&target.name).await;
        let pool = cell
            .get_or_try_init(|| async {
                debug!(
                    db_target = %target.name,
                    address = %target.display_address(),
                    "Creating connection pool"
                );
                let pool = self.connector.connect(target).await?;
                info!(
                    db_target = %target.name,
                    max_connections = target.connection_limit,
                    "Connection pool created"
                );
                Ok::<_, DbError>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    /// Reload the configuration, logging rather than returning failures.
    ///
    /// A failed reload keeps the previous targets, so the caller carries on
    /// with whatever the store held before. Sources may do file I/O, so the
    /// load runs on the blocking pool.
    async fn reload(&self, name: &str, reason: &str) {
        let config = Arc::clone(&self.config);
        let outcome = match tokio::task::spawn_blocking(move || config.load()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(DbError::internal(format!("Configuration reload task failed: {}", e))),
        };

        match outcome {
            Ok(summary) => debug!(
                db_target = %name,
                reason,
                count = summary.count,
                "Configuration reloaded"
            ),
            Err(e) => warn!(
                db_target = %name,
                reason,
                error = %e,
                "Configuration reload failed, keeping previous targets"
            ),
        }
    }

    fn lookup_after_reload(&self, name: &str) -> DbResult<Arc<DatabaseTarget>> {
        self.config
            .get(name)
            .ok_or_else(|| DbError::unknown_target(name, self.config.names()))
    }

    fn creation_failed(&self, name: &str, err: DbError) -> DbError {
        match err {
            DbError::ConnectionFailed { .. } => err,
            other => {
                let suggestion = other
                    .suggestion()
                    .unwrap_or("Check that the target's server is reachable and its credentials are valid")
                    .to_string();
                let message = match other {
                    DbError::Connection { message, .. } => message,
                    other => other.to_string(),
                };
                DbError::connection_failed(name, message, suggestion)
            }
        }
    }
}

impl<C: PoolConnector> std::fmt::Debug for PoolRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
