//! Named database target store with validate-then-swap reloads.
//!
//! The store holds an immutable snapshot of the targets parsed from the
//! configuration source. [`ConfigStore::load`] parses and validates into a
//! fresh snapshot and swaps it in only when everything succeeded, so readers
//! see either the complete old configuration or the complete new one, and a
//! malformed reload leaves the previous configuration in place.

use crate::db::source::ConfigSource;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseTarget;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Parsed targets in configuration order.
#[derive(Debug, Default)]
struct Snapshot {
    targets: Vec<Arc<DatabaseTarget>>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn parse(text: &str) -> DbResult<Self> {
        let targets: Vec<DatabaseTarget> = serde_json::from_str(text).map_err(|e| {
            DbError::configuration(format!("Database targets are not valid JSON: {}", e))
        })?;

        if targets.is_empty() {
            return Err(DbError::configuration(
                "No database targets configured: the target list is empty",
            ));
        }

        let mut snapshot = Snapshot::default();
        for target in targets {
            target.validate().map_err(DbError::configuration)?;
            if snapshot.index.contains_key(&target.name) {
                return Err(DbError::configuration(format!(
                    "Duplicate database target name '{}'",
                    target.name
                )));
            }
            snapshot
                .index
                .insert(target.name.clone(), snapshot.targets.len());
            snapshot.targets.push(Arc::new(target));
        }
        Ok(snapshot)
    }
}

/// Result of a successful [`ConfigStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub count: usize,
    pub default_target: String,
}

pub struct ConfigStore {
    source: Arc<dyn ConfigSource>,
    key: String,
    snapshot: RwLock<Arc<Snapshot>>,
    /// Load attempts, successful or not.
    loads: AtomicU64,
}

impl ConfigStore {
    /// Create an empty store reading targets from `key` in `source`.
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    pub fn new(source: Arc<dyn ConfigSource>, key: impl Into<String>) -> Self {
        Self {
            source,
            key: key.into(),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            loads: AtomicU64::new(0),
        }
    }

    /// Re-read the source and replace the store contents.
    ///
    /// On any error the previous snapshot stays in place.
    pub fn load(&self) -> DbResult<LoadSummary> {
        self.loads.fetch_add(1, Ordering::AcqRel);
        debug!(source = %self.source.describe(), key = %self.key, "Loading database targets");

        let text = self.source.read(&self.key)?.ok_or_else(|| {
            DbError::configuration(format!(
                "Configuration key '{}' is not set in {}",
                self.key,
                self.source.describe()
            ))
        })?;

        let snapshot = match Snapshot::parse(&text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Configuration reload rejected, keeping previous targets");
                return Err(e);
            }
        };

        let summary = LoadSummary {
            count: snapshot.targets.len(),
            // Non-empty is guaranteed by Snapshot::parse.
            default_target: snapshot.targets[0].name.clone(),
        };

        match self.snapshot.write() {
            Ok(mut guard) => *guard = Arc::new(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(snapshot),
        }

        info!(
            count = summary.count,
            default_target = %summary.default_target,
            "Database targets loaded"
        );
        Ok(summary)
    }

    /// Get the descriptor for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<DatabaseTarget>> {
        let snapshot = self.current();
        snapshot
            .index
            .get(name)
            .map(|&idx| Arc::clone(&snapshot.targets[idx]))
    }

    /// Name of the first target of the most recent successful load.
    pub fn default_target(&self) -> Option<String> {
        self.current().targets.first().map(|t| t.name.clone())
    }

    /// Configured target names in configuration order.
    pub fn names(&self) -> Vec<String> {
        self.current()
            .targets
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    /// All configured targets in configuration order.
    pub fn targets(&self) -> Vec<Arc<DatabaseTarget>> {
        self.current().targets.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.current().targets.is_empty()
    }

    /// Number of load attempts so far, including failed ones.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Acquire)
    }

    fn current(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("source", &self.source.describe())
            .field("key", &self.key)
            .field("targets", &self.names())
            .finish()
    }
}
