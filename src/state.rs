//! Process-scoped server state.
//!
//! Exactly one backend is active per process. The state is built once by
//! [`AppState::init`] and torn down by [`AppState::shutdown`].

use crate::config::{BackendConfig, Config, DatabaseConfig};
use crate::database::{create_pool, pool_status, ConnectionPool, MssqlCatalog, SqlCatalog};
use crate::drive::{DriveApi, HttpDriveApi};
use crate::error::ServerError;
use crate::uri::UriCodec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Which kind of backend is being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sql,
    Drive,
}

/// The active backend and what the registry and dispatcher need from it.
#[derive(Clone)]
pub enum Backend {
    Sql {
        catalog: Arc<dyn SqlCatalog>,
        codec: UriCodec,
        /// Human-readable target, e.g. `db.internal:1433/sales`.
        target: String,
    },
    Drive {
        api: Arc<dyn DriveApi>,
        page_size: u32,
    },
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sql { .. } => BackendKind::Sql,
            Backend::Drive { .. } => BackendKind::Drive,
        }
    }

    pub fn codec(&self) -> UriCodec {
        match self {
            Backend::Sql { codec, .. } => codec.clone(),
            Backend::Drive { .. } => UriCodec::Drive,
        }
    }

    /// SQL backend over an arbitrary catalog.
    pub fn sql(catalog: Arc<dyn SqlCatalog>, config: &DatabaseConfig) -> Self {
        Backend::Sql {
            catalog,
            codec: UriCodec::table(config.resource_base()),
            target: format!("{}:{}/{}", config.host, config.port, config.database),
        }
    }
}

/// Shared state for the lifetime of the process.
pub struct AppState {
    backend: Backend,
    pool: Option<ConnectionPool>,
    drain_timeout: Duration,
}

impl AppState {
    /// Connect to the configured backend.
    pub async fn init(config: &Config) -> Result<Self, ServerError> {
        match &config.backend {
            BackendConfig::Mssql(db) => {
                let pool = create_pool(db).await?;
                let catalog = Arc::new(MssqlCatalog::new(pool.clone(), db));
                info!(
                    "SQL backend ready: {}:{}/{} (schema {})",
                    db.host, db.port, db.database, db.schema
                );
                Ok(Self {
                    backend: Backend::sql(catalog, db),
                    pool: Some(pool),
                    drain_timeout: config.drain_timeout,
                })
            }
            BackendConfig::Drive(drive) => {
                let api = HttpDriveApi::connect(drive).await?;
                info!("Google Drive backend ready");
                Ok(Self {
                    backend: Backend::Drive {
                        api: Arc::new(api),
                        page_size: drive.page_size,
                    },
                    pool: None,
                    drain_timeout: config.drain_timeout,
                })
            }
        }
    }

    /// State over an already-built backend, without a pool to drain.
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            pool: None,
            drain_timeout: Duration::ZERO,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Wait for checked-out connections to come back.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            let deadline = Instant::now() + self.drain_timeout;
            loop {
                let status = pool_status(pool);
                if status.in_use_connections == 0 {
                    info!("Connection pool drained");
                    break;
                }
                if Instant::now() >= deadline {
                    warn!(
                        "Drain timeout reached with {} connection(s) still in use",
                        status.in_use_connections
                    );
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        info!("Server state released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::database::catalog::mock::MockCatalog;
    use crate::drive::api::mock::MockDrive;

    fn db_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".into(),
            port: 1433,
            database: "sales".into(),
            schema: "dbo".into(),
            username: "sa".into(),
            password: "hunter2".into(),
            pool: PoolConfig::default(),
            encrypt: false,
            trust_server_certificate: true,
            application_name: "test".into(),
            max_result_rows: 100,
            page_size: 10,
        }
    }

    #[test]
    fn test_backend_kind_and_codec() {
        let sql = Backend::sql(Arc::new(MockCatalog::default()), &db_config());
        assert_eq!(sql.kind(), BackendKind::Sql);
        assert_eq!(
            sql.codec(),
            UriCodec::table("mssql://db.internal:1433/sales")
        );

        let drive = Backend::Drive {
            api: Arc::new(MockDrive::default()),
            page_size: 10,
        };
        assert_eq!(drive.kind(), BackendKind::Drive);
        assert_eq!(drive.codec(), UriCodec::Drive);
    }

    #[tokio::test]
    async fn test_shutdown_without_pool() {
        let state = AppState::with_backend(Backend::Drive {
            api: Arc::new(MockDrive::default()),
            page_size: 10,
        });
        state.shutdown().await;
    }
}
