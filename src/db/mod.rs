//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Configuration sources and the named target store
//! - Lazily created connection pools per target
//! - Query execution
//! - Schema introspection
//! - Type mappings

pub mod config_store;
pub mod executor;
pub mod pool;
pub mod registry;
pub mod schema;
pub mod source;
pub mod types;

pub use config_store::{ConfigStore, LoadSummary};
pub use executor::QueryExecutor;
pub use pool::{MySqlConnector, MySqlRegistry};
pub use registry::{PoolConnector, PoolRegistry, ShutdownReport};
pub use schema::SchemaInspector;
pub use source::{ConfigSource, EnvFileSource, MemorySource};
