//! MCP server entry point.
//!
//! This binary starts the MCP server using stdio transport for integration
//! with Claude Desktop, Cursor, and other MCP clients. `MCP_BACKEND` picks
//! between SQL Server (`mssql`) and Google Drive (`gdrive`).

use anyhow::Result;
use mssql_gdrive_mcp_server::shutdown::{install_signal_handlers, ShutdownController};
use mssql_gdrive_mcp_server::{Config, McpServer};
use rmcp::ServiceExt;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is reserved for JSON-RPC)
    init_logging();

    let version = env!("CARGO_PKG_VERSION");
    info!("MCP server v{version} starting (transport: stdio)");

    let config = Config::from_env()?;
    info!("Configuration loaded, backend: {}", config.backend_name());

    let shutdown_controller = Arc::new(ShutdownController::new());
    install_signal_handlers(Arc::clone(&shutdown_controller));

    let server = McpServer::new(&config).await?;
    let state = server.state();
    info!("Server initialized. Ready to accept requests...");

    let transport = rmcp::transport::stdio();
    let service = server.serve(transport).await?;

    let mut shutdown_signal = shutdown_controller.signal();

    tokio::select! {
        quit_reason = service.waiting() => {
            match quit_reason {
                Ok(reason) => info!("Service stopped: {reason:?}"),
                Err(e) => error!("Service error: {e}"),
            }
        }
        _ = shutdown_signal.recv() => {
            info!("Shutdown signal received");
        }
    }

    state.shutdown().await;
    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing subscriber with stderr output.
///
/// Logs MUST go to stderr because stdout is used for JSON-RPC communication.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,mssql_gdrive_mcp_server=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
