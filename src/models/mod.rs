//! Data models for the MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;
pub mod target;

pub use query::{ColumnMetadata, QueryParam, QueryResult};
pub use schema::{ColumnDefinition, TableLayout, split_qualified_name};
pub use target::{DatabaseTarget, TargetSummary};
