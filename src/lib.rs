//! Multi-target MySQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to run SQL against several named MySQL databases, with connection pools
//! created on first use, configuration reloaded on demand, and a command
//! allow-list applied to every statement.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
