//! Error types for the MCP server.
//!
//! `ServerError` is the single taxonomy shared by both backends. Protocol
//! faults are converted into `rmcp::ErrorData`; every other variant is
//! rendered into an `isError` tool result at the handler boundary.

use rmcp::ErrorData;
use thiserror::Error;

/// Domain-specific errors for the MCP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource URI is malformed or uses an unrecognized prefix.
    #[error("Invalid resource URI '{uri}': {reason}")]
    InvalidResourceUri { uri: String, reason: String },

    /// Pagination cursor was not produced by this server.
    #[error("Invalid pagination cursor '{0}'")]
    InvalidCursor(String),

    /// Tool name is not registered for this backend.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments do not match the declared input schema.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The current identity lacks the required capability on an object.
    #[error(
        "The account {identity} does not have {} access to this file",
        if *require_edit { "edit" } else { "read" }
    )]
    AccessDenied { require_edit: bool, identity: String },

    /// The object does not exist or is invisible to the current identity.
    #[error("File '{file_id}' was not found or is not visible to the account {identity}")]
    NotFoundOrForbidden { file_id: String, identity: String },

    /// A file id or sharing URL could not be parsed.
    #[error("Could not extract a file id from '{0}'")]
    InvalidObjectReference(String),

    /// Range expression or sheet lookup failed.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Malformed hex color.
    #[error("Invalid color '{0}': expected a hex color such as #ff0000")]
    InvalidColor(String),

    /// Opaque upstream failure, message passed through.
    #[error("Backend error: {message}")]
    Backend { message: String, status: Option<u16> },

    /// Rolling back a guarded transaction failed.
    #[error("Rollback failed: {0}")]
    RollbackFailure(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid resource URI error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResourceUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid arguments error.
    pub fn invalid_arguments(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid range error.
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Create a backend error without an HTTP status.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
            status: None,
        }
    }

    /// Create a backend error carrying the upstream HTTP status.
    pub fn backend_with_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Backend {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a protocol fault rather than a tool result.
    pub fn is_protocol_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidResourceUri { .. }
                | Self::InvalidCursor(_)
                | Self::UnknownTool(_)
                | Self::InvalidArguments { .. }
        )
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your environment variables and configuration"),
            Self::Connection { .. } => {
                Some("Check server hostname, port, and network connectivity")
            }
            Self::Authentication(_) => Some(
                "Re-run the OAuth authorization flow to refresh the saved credentials file",
            ),
            Self::AccessDenied {
                require_edit: true,
                ..
            } => Some(
                "Ask the owner to share the file with this account as an editor, \
                 or sign in with an account that can edit it",
            ),
            Self::AccessDenied { .. } => Some(
                "Ask the owner to share the file with this account, \
                 or make it viewable by anyone with the link",
            ),
            Self::NotFoundOrForbidden { .. } => Some(
                "Check the file id or URL, and make sure you are signed in with \
                 the account the file is shared with",
            ),
            Self::InvalidObjectReference(_) => Some(
                "Pass the raw file id or a sharing URL such as \
                 https://docs.google.com/spreadsheets/d/<id>/edit",
            ),
            Self::InvalidRange(_) => {
                Some("Use A1 notation such as Sheet1!A1:C10 and an existing sheet name")
            }
            Self::InvalidColor(_) => Some("Use a #rrggbb hex color, for example #1a73e8"),
            _ => None,
        }
    }

    /// Render this error as the text of an `isError` tool result.
    pub fn to_user_message(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("{self}\n\nSuggestion: {hint}"),
            None => self.to_string(),
        }
    }
}

/// Convert ServerError to rmcp's ErrorData for protocol responses.
///
/// Tool errors should generally be returned as `CallToolResult::error` instead
/// of using this conversion. This is primarily for protocol-level errors.
impl From<ServerError> for ErrorData {
    fn from(e: ServerError) -> Self {
        match e {
            ServerError::InvalidResourceUri { .. }
            | ServerError::InvalidCursor(_)
            | ServerError::UnknownTool(_)
            | ServerError::InvalidArguments { .. } => ErrorData::invalid_params(e.to_string(), None),
            other => ErrorData::internal_error(other.to_string(), None),
        }
    }
}

impl From<tiberius::error::Error> for ServerError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match &e {
            Error::Server(token) => ServerError::backend(format!(
                "SQL Server error {}: {}",
                token.code(),
                token.message()
            )),
            Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } => {
                ServerError::connection(e.to_string())
            }
            _ => ServerError::backend(e.to_string()),
        }
    }
}

impl From<bb8::RunError<bb8_tiberius::Error>> for ServerError {
    fn from(e: bb8::RunError<bb8_tiberius::Error>) -> Self {
        match e {
            bb8::RunError::TimedOut => {
                ServerError::connection("Timed out waiting for a pooled connection")
            }
            bb8::RunError::User(inner) => {
                ServerError::connection_with_source("Pool error", inner)
            }
        }
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return ServerError::connection_with_source("Google API request failed", e);
        }
        match e.status() {
            Some(status) => ServerError::backend_with_status(e.to_string(), status.as_u16()),
            None => ServerError::backend(e.to_string()),
        }
    }
}
