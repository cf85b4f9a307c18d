//! Centralized constants for the MCP server.
//!
//! This module contains all magic numbers and default values used throughout
//! the codebase, making them easy to find, understand, and modify.

use std::time::Duration;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout as Duration.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration =
    Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS);

/// Default idle timeout for pooled connections in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default HTTP request timeout for Google APIs in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default time to wait for in-flight work during shutdown.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Connection Pool Constants
// =============================================================================

/// Default minimum connections in pool.
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default maximum connections in pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default SQL Server port.
pub const DEFAULT_MSSQL_PORT: u16 = 1433;

/// Schema whose tables are exposed as resources.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Database used when `MSSQL_DATABASE` is not set.
pub const DEFAULT_DATABASE: &str = "master";

// =============================================================================
// Result Size Constants
// =============================================================================

/// Default maximum result rows returned by the `query` tool.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 10_000;

/// Default number of tables per resource listing page.
pub const DEFAULT_TABLE_PAGE_SIZE: usize = 100;

/// Default number of Drive files per resource listing page.
pub const DEFAULT_DRIVE_PAGE_SIZE: u32 = 10;

/// Number of files returned by the `search` tool.
pub const SEARCH_PAGE_SIZE: u32 = 10;

// =============================================================================
// URI Scheme Constants
// =============================================================================

/// URI scheme for SQL Server table resources.
pub const MSSQL_SCHEME: &str = "mssql";

/// URI prefix for Google Drive file resources.
pub const GDRIVE_URI_PREFIX: &str = "gdrive:///";

/// Trailing path segment naming the schema view of a table.
pub const SCHEMA_VIEW: &str = "schema";

// =============================================================================
// Google API Constants
// =============================================================================

/// Drive v3 REST base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Sheets v4 REST base URL.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Token endpoint used when the client keys file does not name one.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default location of the saved OAuth token.
pub const DEFAULT_CREDENTIALS_PATH: &str = ".gdrive-server-credentials.json";

/// Default location of the OAuth client keys.
pub const DEFAULT_OAUTH_KEYS_PATH: &str = "gcp-oauth.keys.json";

/// Range read when neither a sheet nor a range is supplied.
///
/// Unqualified, so the Sheets API applies it to the first sheet.
pub const DEFAULT_READ_RANGE: &str = "A1:Z1000";

/// Seconds before expiry at which a cached access token is refreshed.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

// =============================================================================
// Logging Constants
// =============================================================================

/// Maximum length of query text written to logs.
pub const LOG_QUERY_MAX_LEN: usize = 200;
