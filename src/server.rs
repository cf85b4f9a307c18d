//! MCP server struct definition and initialization.

use crate::config::Config;
use crate::error::ServerError;
use crate::state::{AppState, Backend, BackendKind};
use std::sync::Arc;

/// The MCP server instance.
///
/// This struct is cloned for each request, but the inner state
/// is shared via Arc. The server provides:
///
/// - **Resources**: table schemas (SQL) or files (Drive)
/// - **Tools**: read-only queries (SQL) or search and spreadsheet editing (Drive)
#[derive(Clone)]
pub struct McpServer {
    pub(crate) state: Arc<AppState>,
}

impl McpServer {
    /// Connect to the configured backend and build a server over it.
    pub async fn new(config: &Config) -> Result<Self, ServerError> {
        let state = AppState::init(config).await?;
        Ok(Self::from_state(Arc::new(state)))
    }

    /// Server over existing state.
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Server over a backend with nothing to drain on shutdown.
    pub fn with_backend(backend: Backend) -> Self {
        Self::from_state(Arc::new(AppState::with_backend(backend)))
    }

    pub fn backend(&self) -> &Backend {
        self.state.backend()
    }

    pub fn kind(&self) -> BackendKind {
        self.backend().kind()
    }

    /// Shared handle to the state, kept by `main` for shutdown.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }
}
