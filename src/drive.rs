//! Google Drive and Sheets backend.

pub mod access;
pub mod api;
pub mod auth;
pub mod export;
pub mod format;
pub mod range;
pub mod reference;
pub mod types;

pub use access::{verify, AccessDecision};
pub use api::{DriveApi, HttpDriveApi};
pub use range::CellRange;
