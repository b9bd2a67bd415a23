//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use tokio::signal;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    service: DbService,
}

impl StdioTransport {
    pub fn new(service: DbService) -> Self {
        Self { service }
    }

    /// Close every pool and log what failed.
    async fn shutdown(&self) {
        info!("Closing all database connections");
        let report = self.service.registry().shutdown_all().await;
        for (name, err) in &report.failures {
            warn!(db_target = %name, error = %err, "Pool did not close cleanly");
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = match self.service.clone().serve(stdio()).await {
            Ok(running) => running,
            Err(e) => {
                self.shutdown().await;
                return Err(DbError::internal(format!(
                    "Failed to start stdio transport: {}",
                    e
                )));
            }
        };

        let (shutdown_requested, outcome) = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                        (false, Ok(()))
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        (false, Err(DbError::internal(format!("Stdio transport error: {}", e))))
                    }
                }
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                (true, Ok(()))
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.shutdown().await;

        if shutdown_requested {
            // tokio::select! cannot interrupt a blocking stdin read
            info!("Exiting process");
            std::process::exit(0);
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// If a handler cannot be installed that signal is ignored rather than
/// treated as received.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConfigStore, MemorySource, MySqlConnector, PoolRegistry, QueryExecutor};
    use crate::tools::CommandGate;
    use std::sync::Arc;

    #[test]
    fn test_stdio_transport_creation() {
        let config = Arc::new(ConfigStore::new(Arc::new(MemorySource::new()), "K"));
        let registry = Arc::new(PoolRegistry::new(config, MySqlConnector::new()));
        let gate = Arc::new(CommandGate::from_selector(None).unwrap());
        let service = DbService::new(registry, gate, None, QueryExecutor::new());
        let transport = StdioTransport::new(service);
        assert_eq!(transport.name(), "stdio");
    }
}
