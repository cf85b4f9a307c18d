//! Configuration management for the MCP server.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_CREDENTIALS_PATH,
    DEFAULT_DATABASE, DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_DRIVE_PAGE_SIZE,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_RESULT_ROWS, DEFAULT_MIN_CONNECTIONS, DEFAULT_MSSQL_PORT,
    DEFAULT_OAUTH_KEYS_PATH, DEFAULT_SCHEMA, DEFAULT_TABLE_PAGE_SIZE, MSSQL_SCHEME,
};
use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which backend this process serves.
    pub backend: BackendConfig,

    /// How long shutdown waits for in-flight work.
    pub drain_timeout: Duration,
}

/// Backend selection together with its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendConfig {
    /// SQL Server tables and the `query` tool.
    Mssql(DatabaseConfig),

    /// Google Drive files and the spreadsheet tools.
    Drive(DriveConfig),
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQL Server hostname or IP address
    pub host: String,

    /// SQL Server port (default: 1433)
    pub port: u16,

    /// Database name
    pub database: String,

    /// Schema whose tables are listed as resources
    pub schema: String,

    /// SQL Server authentication
    pub username: String,

    /// SQL Server password. Never part of a resource URI or serialized output.
    #[serde(skip_serializing, default)]
    pub password: String,

    /// Connection pool configuration
    pub pool: PoolConfig,

    /// Enable TLS encryption
    pub encrypt: bool,

    /// Trust server certificate (for self-signed certs)
    pub trust_server_certificate: bool,

    /// Application name sent to SQL Server
    pub application_name: String,

    /// Maximum result rows per query
    pub max_result_rows: usize,

    /// Tables per resource listing page
    pub page_size: usize,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum number of idle connections kept in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Idle connection timeout
    pub idle_timeout: Duration,
}

/// Google Drive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Saved OAuth token file.
    pub credentials_path: PathBuf,

    /// OAuth client keys file (needed to refresh tokens).
    pub oauth_keys_path: PathBuf,

    /// Static access token overriding the credentials file.
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,

    /// Files per resource listing page.
    pub page_size: u32,

    /// Timeout applied to every Google API request.
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MCP_BACKEND`: `mssql` (default) or `gdrive`
    ///
    /// ## SQL Server backend
    /// - `MSSQL_HOST`: SQL Server hostname (required)
    /// - `MSSQL_USER`: SQL Server username (required)
    /// - `MSSQL_PASSWORD`: SQL Server password (required)
    /// - `MSSQL_PORT`: Port number (default: 1433)
    /// - `MSSQL_DATABASE`: Database name (default: master)
    /// - `MSSQL_SCHEMA`: Schema listed as resources (default: dbo)
    /// - `MSSQL_ENCRYPT`: Enable TLS (default: true)
    /// - `MSSQL_TRUST_CERT`: Trust server certificate (default: false)
    /// - `MSSQL_POOL_MIN`: Minimum idle pool connections (default: 1)
    /// - `MSSQL_POOL_MAX`: Maximum pool connections (default: 10)
    /// - `MSSQL_CONNECT_TIMEOUT`: Connection timeout in seconds (default: 30)
    /// - `MSSQL_IDLE_TIMEOUT`: Idle timeout in seconds (default: 300)
    /// - `MSSQL_MAX_ROWS`: Maximum result rows (default: 10000)
    /// - `MSSQL_PAGE_SIZE`: Tables per resource page (default: 100)
    ///
    /// ## Google Drive backend
    /// - `GDRIVE_CREDENTIALS_PATH`: Saved OAuth token (default: .gdrive-server-credentials.json)
    /// - `GDRIVE_OAUTH_PATH`: OAuth client keys (default: gcp-oauth.keys.json)
    /// - `GDRIVE_ACCESS_TOKEN`: Static access token, skips the credentials file
    /// - `GDRIVE_PAGE_SIZE`: Files per resource page (default: 10)
    /// - `GDRIVE_HTTP_TIMEOUT`: Request timeout in seconds (default: 30)
    ///
    /// ## Shutdown
    /// - `MCP_DRAIN_TIMEOUT`: Seconds to wait for in-flight queries (default: 10)
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("MCP_BACKEND").map(|s| s.to_lowercase()).as_deref() {
            None | Some("mssql") | Some("sqlserver") | Some("sql") => {
                BackendConfig::Mssql(DatabaseConfig::from_lookup(&lookup)?)
            }
            Some("gdrive") | Some("drive") | Some("sheets") => {
                BackendConfig::Drive(DriveConfig::from_lookup(&lookup))
            }
            Some(other) => {
                return Err(ServerError::config(format!(
                    "Unknown MCP_BACKEND '{}'. Valid values: mssql, gdrive",
                    other
                )))
            }
        };

        let drain_secs = parse_or(&lookup, "MCP_DRAIN_TIMEOUT", DEFAULT_DRAIN_TIMEOUT_SECS);

        Ok(Config {
            backend,
            drain_timeout: Duration::from_secs(drain_secs),
        })
    }

    /// Short backend label for logs and server instructions.
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            BackendConfig::Mssql(_) => "mssql",
            BackendConfig::Drive(_) => "gdrive",
        }
    }
}

impl DatabaseConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Required: Host
        let host = lookup("MSSQL_HOST")
            .ok_or_else(|| ServerError::config("MSSQL_HOST environment variable is required"))?;

        let (username, password) = match (lookup("MSSQL_USER"), lookup("MSSQL_PASSWORD")) {
            (Some(u), Some(p)) => (u, p),
            (Some(_), None) => {
                return Err(ServerError::config(
                    "MSSQL_PASSWORD is required when MSSQL_USER is set",
                ))
            }
            (None, Some(_)) => {
                return Err(ServerError::config(
                    "MSSQL_USER is required when MSSQL_PASSWORD is set",
                ))
            }
            (None, None) => {
                return Err(ServerError::config(
                    "Authentication required: set MSSQL_USER and MSSQL_PASSWORD",
                ))
            }
        };

        let encrypt = lookup("MSSQL_ENCRYPT")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        let trust_server_certificate = lookup("MSSQL_TRUST_CERT")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(DatabaseConfig {
            host,
            port: parse_or(lookup, "MSSQL_PORT", DEFAULT_MSSQL_PORT),
            database: lookup("MSSQL_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            schema: lookup("MSSQL_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            username,
            password,
            pool: PoolConfig {
                min_connections: parse_or(lookup, "MSSQL_POOL_MIN", DEFAULT_MIN_CONNECTIONS),
                max_connections: parse_or(lookup, "MSSQL_POOL_MAX", DEFAULT_MAX_CONNECTIONS),
                connection_timeout: Duration::from_secs(parse_or(
                    lookup,
                    "MSSQL_CONNECT_TIMEOUT",
                    DEFAULT_CONNECTION_TIMEOUT_SECS,
                )),
                idle_timeout: Duration::from_secs(parse_or(
                    lookup,
                    "MSSQL_IDLE_TIMEOUT",
                    DEFAULT_IDLE_TIMEOUT_SECS,
                )),
            },
            encrypt,
            trust_server_certificate,
            application_name: env!("CARGO_PKG_NAME").to_string(),
            max_result_rows: parse_or(lookup, "MSSQL_MAX_ROWS", DEFAULT_MAX_RESULT_ROWS),
            page_size: parse_or(lookup, "MSSQL_PAGE_SIZE", DEFAULT_TABLE_PAGE_SIZE).max(1),
        })
    }

    /// Base of every table resource URI: `mssql://host:port/database`.
    ///
    /// Never includes credentials.
    pub fn resource_base(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            MSSQL_SCHEME,
            self.host,
            self.port,
            urlencoding::encode(&self.database)
        )
    }
}

impl DriveConfig {
    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        DriveConfig {
            credentials_path: lookup("GDRIVE_CREDENTIALS_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string())
                .into(),
            oauth_keys_path: lookup("GDRIVE_OAUTH_PATH")
                .unwrap_or_else(|| DEFAULT_OAUTH_KEYS_PATH.to_string())
                .into(),
            access_token: lookup("GDRIVE_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            page_size: parse_or(lookup, "GDRIVE_PAGE_SIZE", DEFAULT_DRIVE_PAGE_SIZE).max(1),
            http_timeout: Duration::from_secs(parse_or(
                lookup,
                "GDRIVE_HTTP_TIMEOUT",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
