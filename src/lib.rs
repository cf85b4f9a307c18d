//! # MSSQL / Google Drive MCP Server
//!
//! A Model Context Protocol (MCP) server over one of two backends, chosen at
//! startup:
//!
//! - **SQL Server**: every table in the configured schema is a resource whose
//!   content is its column list, and the `query` tool runs SQL inside a
//!   transaction that is always rolled back.
//! - **Google Drive**: every file is a resource (Workspace documents are
//!   exported to text), plus tools to search files and to read, edit and
//!   format Google Sheets.
//!
//! ## Architecture
//!
//! The server follows MCP protocol semantics:
//! - Resources for passive data access
//! - Tools for active operations

pub mod config;
pub mod constants;
pub mod database;
pub mod drive;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod resources;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod tools;
pub mod uri;

pub use config::Config;
pub use error::ServerError;
pub use server::McpServer;
