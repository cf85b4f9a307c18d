//! Connection pool management for SQL Server.

use crate::config::DatabaseConfig;
use crate::error::ServerError;
use bb8_tiberius::ConnectionManager;
use std::time::Duration;
use tiberius::{AuthMethod, Config, EncryptionLevel};
use tracing::{debug, info};

/// Type alias for the connection pool.
pub type ConnectionPool = bb8::Pool<ConnectionManager>;

/// Type alias for a pooled connection.
pub type PooledConn<'a> = bb8::PooledConnection<'a, ConnectionManager>;

/// Build the tiberius configuration for a database config.
pub fn create_config(db_config: &DatabaseConfig) -> Config {
    let mut config = Config::new();

    config.host(&db_config.host);
    config.port(db_config.port);
    config.database(&db_config.database);
    config.authentication(AuthMethod::sql_server(
        &db_config.username,
        &db_config.password,
    ));

    if db_config.encrypt {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::Off);
    }

    if db_config.trust_server_certificate {
        config.trust_cert();
    }

    config.application_name(&db_config.application_name);

    config
}

/// Create a connection pool from configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<ConnectionPool, ServerError> {
    info!(
        "Creating connection pool for {}:{} (min: {}, max: {})",
        config.host, config.port, config.pool.min_connections, config.pool.max_connections
    );

    let manager = ConnectionManager::new(create_config(config));

    // bb8 rejects a zero pool size or timeout.
    let max_size = config.pool.max_connections.max(1);
    let pool = bb8::Pool::builder()
        .max_size(max_size)
        .min_idle(Some(config.pool.min_connections.min(max_size)))
        .connection_timeout(config.pool.connection_timeout.max(Duration::from_secs(1)))
        .idle_timeout(Some(config.pool.idle_timeout))
        .build(manager)
        .await
        .map_err(|e| ServerError::connection_with_source("Failed to create connection pool", e))?;

    // Test the pool by getting a connection
    {
        let _conn = pool.get().await.map_err(|e| {
            ServerError::connection(format!("Failed to establish initial connection: {}", e))
        })?;
        debug!("Initial connection test successful");
    }

    info!("Connection pool created successfully");
    Ok(pool)
}

/// Get pool health status.
pub fn pool_status(pool: &ConnectionPool) -> PoolStatus {
    let state = pool.state();
    PoolStatus {
        total_connections: state.connections as usize,
        idle_connections: state.idle_connections as usize,
        in_use_connections: state.connections.saturating_sub(state.idle_connections) as usize,
    }
}

/// Pool status information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Total number of connections in the pool.
    pub total_connections: usize,
    /// Number of idle connections.
    pub idle_connections: usize,
    /// Number of connections currently checked out.
    pub in_use_connections: usize,
}
