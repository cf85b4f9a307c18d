//! Database connectivity and query execution.

pub mod catalog;
mod connection;
pub mod guard;
mod query;
mod types;

pub use catalog::{MssqlCatalog, SqlCatalog, TableColumn};
pub use connection::{create_pool, pool_status, ConnectionPool, PoolStatus};
pub use guard::{execute_read_only, ConnectionSource, TransactionalConnection};
pub use query::{truncate_for_log, ColumnInfo, QueryResult, ResultRow};
pub use types::TypeMapper;
