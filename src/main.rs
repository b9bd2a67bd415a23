//! Multi-target MySQL MCP Server - Main entry point.
//!
//! Reads the named database targets and the security level from a dotenv
//! file (or the process environment) and serves MCP over stdio.

use clap::Parser;
use multi_mysql_mcp::config::Config;
use multi_mysql_mcp::db::{
    ConfigSource, ConfigStore, EnvFileSource, MySqlConnector, PoolRegistry, QueryExecutor,
};
use multi_mysql_mcp::mcp::DbService;
use multi_mysql_mcp::tools::{CommandGate, StatementGuard};
use multi_mysql_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr since stdout carries the JSON-RPC stream.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!(
        env_file = %config.env_file.display(),
        "Starting multi-mysql-mcp v{}",
        env!("CARGO_PKG_VERSION")
    );

    let source: Arc<dyn ConfigSource> = Arc::new(EnvFileSource::new(&config.env_file));
    let store = Arc::new(ConfigStore::new(source.clone(), &config.databases_key));

    // An unusable configuration at startup is fatal; later reloads are not.
    let summary = match store.load() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!(
                "Set {} in {} (or the environment) to a JSON array of targets, e.g.:",
                config.databases_key,
                config.env_file.display()
            );
            eprintln!(
                r#"  {}='[{{"name":"main","host":"localhost","user":"app","password":"secret","database":"shop"}}]'"#,
                config.databases_key
            );
            std::process::exit(1);
        }
    };

    // The security level is read once; changing it requires a restart.
    let selector = source.read(&config.security_level_key)?;
    let gate = Arc::new(CommandGate::from_selector(selector.as_deref())?);
    let guard = config.single_statement.then(StatementGuard::new);

    info!(
        targets = summary.count,
        default_target = %summary.default_target,
        security_level = gate.policy().name(),
        single_statement = guard.is_some(),
        "Configuration loaded"
    );

    let connector = MySqlConnector::new().with_idle_timeout(config.idle_timeout_duration());
    let registry = Arc::new(PoolRegistry::new(store, connector));
    let executor = QueryExecutor::with_defaults(
        config.query_timeout_duration(),
        config.effective_max_rows(),
    );
    let service = DbService::new(registry, gate, guard, executor);

    let transport = StdioTransport::new(service);
    info!(transport = transport.name(), "Serving MCP");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
