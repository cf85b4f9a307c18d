//! Integration tests for the SQL Server backend.
//!
//! These tests support two modes:
//! 1. **Testcontainers** (default): Automatically spins up SQL Server containers
//! 2. **External server**: Connect to existing server via MSSQL_HOST env var
//!
//! ## Running with testcontainers (requires Docker):
//! ```bash
//! cargo test --test integration_tests -- --ignored --test-threads=1
//! ```
//!
//! ## Running against external server (e.g., CI service container):
//! ```bash
//! MSSQL_HOST=localhost MSSQL_PORT=1433 MSSQL_PASSWORD='yourPass' \
//!   cargo test --test integration_tests -- --ignored --test-threads=1
//! ```
//!
//! Note: SQL Server container requires ~2GB RAM and takes 30-60 seconds to start.

use mssql_gdrive_mcp_server::config::{DatabaseConfig, PoolConfig};
use mssql_gdrive_mcp_server::database::{
    create_pool, execute_read_only, pool_status, ConnectionPool, MssqlCatalog, SqlCatalog,
};
use mssql_gdrive_mcp_server::pagination::Cursor;
use mssql_gdrive_mcp_server::state::Backend;
use mssql_gdrive_mcp_server::tools::call_tool;
use rmcp::model::CallToolResult;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::mssql_server::MssqlServer;

/// Default SA password for testcontainers.
const DEFAULT_SA_PASSWORD: &str = "yourStrong(!)Password";

/// Database created for each test run.
const TEST_DATABASE: &str = "mcp_test";

/// Default image tag for tests.
const DEFAULT_VERSION: &str = "2022-latest";

fn get_test_version() -> String {
    std::env::var("MSSQL_TEST_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string())
}

/// Check if we should use an external server (vs testcontainers).
fn use_external_server() -> bool {
    std::env::var("MSSQL_HOST").is_ok()
}

#[allow(dead_code)] // Variants held for lifetime management (Drop trait)
enum TestDatabaseSource {
    External,
    Container(Box<ContainerAsync<MssqlServer>>),
}

/// A SQL Server with a freshly created test database.
struct TestDatabase {
    #[allow(dead_code)] // Held for lifetime management (Drop trait on Container)
    source: TestDatabaseSource,
    host: String,
    port: u16,
    password: String,
}

impl TestDatabase {
    async fn new() -> Self {
        let db = if use_external_server() {
            Self::from_external()
        } else {
            Self::from_testcontainer(&get_test_version()).await
        };
        db.recreate_test_database().await;
        db
    }

    fn from_external() -> Self {
        let host = std::env::var("MSSQL_HOST").expect("MSSQL_HOST must be set");
        let port = std::env::var("MSSQL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433);
        let password =
            std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| DEFAULT_SA_PASSWORD.to_string());

        eprintln!("Using external SQL Server at {}:{}", host, port);

        Self {
            source: TestDatabaseSource::External,
            host,
            port,
            password,
        }
    }

    async fn from_testcontainer(version: &str) -> Self {
        eprintln!("Starting SQL Server {} container via testcontainers...", version);

        let container = MssqlServer::default()
            .with_accept_eula()
            .with_tag(version)
            .start()
            .await
            .unwrap_or_else(|e| panic!("Failed to start SQL Server {} container: {}", version, e));

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(1433)
            .await
            .expect("Failed to get port");

        // Wait a bit for SQL Server to fully initialize
        tokio::time::sleep(Duration::from_secs(5)).await;

        Self {
            source: TestDatabaseSource::Container(Box::new(container)),
            host: host.to_string(),
            port,
            password: DEFAULT_SA_PASSWORD.to_string(),
        }
    }

    fn config(&self, database: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host.clone(),
            port: self.port,
            database: database.to_string(),
            schema: "dbo".to_string(),
            username: "sa".to_string(),
            password: self.password.clone(),
            pool: PoolConfig {
                max_connections: 4,
                ..PoolConfig::default()
            },
            encrypt: false,
            trust_server_certificate: true,
            application_name: "mcp-integration-tests".to_string(),
            max_result_rows: 100,
            page_size: 2,
        }
    }

    async fn recreate_test_database(&self) {
        let pool = create_pool(&self.config("master"))
            .await
            .expect("Failed to connect to master");
        let mut conn = pool.get().await.expect("Failed to get connection");
        conn.simple_query(format!(
            "IF DB_ID('{db}') IS NOT NULL DROP DATABASE [{db}]; CREATE DATABASE [{db}]",
            db = TEST_DATABASE
        ))
        .await
        .expect("Failed to create test database")
        .into_results()
        .await
        .expect("Failed to drain results");
    }

    async fn pool(&self) -> ConnectionPool {
        create_pool(&self.config(TEST_DATABASE))
            .await
            .expect("Failed to create pool")
    }

    /// Run setup SQL outside the read-only guard.
    async fn seed(&self, pool: &ConnectionPool, sql: &str) {
        let mut conn = pool.get().await.expect("Failed to get connection");
        conn.simple_query(sql)
            .await
            .expect("Seed query failed")
            .into_results()
            .await
            .expect("Failed to drain results");
    }

    async fn seed_schema(&self, pool: &ConnectionPool) {
        self.seed(pool, SEED_TABLES).await;
        self.seed(pool, SEED_VIEW).await;
    }
}

const SEED_TABLES: &str = "
    CREATE TABLE dbo.customers (id INT PRIMARY KEY, name NVARCHAR(100), created DATETIME2);
    CREATE TABLE dbo.[order lines] (order_id INT, sku NVARCHAR(20), qty INT, price DECIMAL(10,2));
    CREATE TABLE dbo.orders (id INT PRIMARY KEY, customer_id INT, total DECIMAL(12,2));
    INSERT INTO dbo.customers (id, name, created) VALUES (1, N'Alice', SYSUTCDATETIME());
";

/// Views must be created in their own batch; they never show up as resources.
const SEED_VIEW: &str = "CREATE VIEW dbo.big_orders AS SELECT id FROM dbo.orders WHERE total > 100";

fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Catalog Tests
// =============================================================================

mod catalog_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_list_tables_pages_through_base_tables() {
        let db = TestDatabase::new().await;
        let pool = db.pool().await;
        db.seed_schema(&pool).await;
        let catalog = MssqlCatalog::new(pool, &db.config(TEST_DATABASE));

        let first = catalog.list_tables(None).await.expect("first page");
        assert_eq!(first.items, vec!["customers", "order lines"]);
        let cursor: Cursor = first.next_cursor.expect("more tables expected");

        let second = catalog.list_tables(Some(&cursor)).await.expect("second page");
        assert_eq!(second.items, vec!["orders"]);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_table_columns_in_declaration_order() {
        let db = TestDatabase::new().await;
        let pool = db.pool().await;
        db.seed_schema(&pool).await;
        let catalog = MssqlCatalog::new(pool, &db.config(TEST_DATABASE));

        let columns = catalog.table_columns("order lines").await.expect("columns");
        let names: Vec<_> = columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "sku", "qty", "price"]);
        assert_eq!(columns[1].data_type, "nvarchar");

        let missing = catalog.table_columns("ghost").await.expect("columns");
        assert!(missing.is_empty());
    }
}

// =============================================================================
// Read-only Guard Tests
// =============================================================================

mod guard_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_writes_are_rolled_back() {
        let db = TestDatabase::new().await;
        let pool = db.pool().await;
        db.seed_schema(&pool).await;

        let inside = execute_read_only(
            &pool,
            "INSERT INTO dbo.orders (id, customer_id, total) VALUES (7, 1, 250.00); \
             SELECT COUNT(*) AS n FROM dbo.orders",
            100,
        )
        .await
        .expect("query inside guard");
        assert_eq!(inside.rows[0].get("n"), Some(&json!(1)));

        let after = execute_read_only(&pool, "SELECT COUNT(*) AS n FROM dbo.orders", 100)
            .await
            .expect("query after guard");
        assert_eq!(after.rows[0].get("n"), Some(&json!(0)));
        assert_eq!(pool_status(&pool).in_use_connections, 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_failed_query_returns_connection() {
        let db = TestDatabase::new().await;
        let pool = db.pool().await;

        for _ in 0..6 {
            let result = execute_read_only(&pool, "SELECT * FROM dbo.does_not_exist", 100).await;
            assert!(result.is_err());
        }

        assert_eq!(pool_status(&pool).in_use_connections, 0);
        let ok = execute_read_only(&pool, "SELECT 1 AS one", 100)
            .await
            .expect("pool still usable");
        assert_eq!(ok.rows[0].get("one"), Some(&json!(1)));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_row_limit_truncates() {
        let db = TestDatabase::new().await;
        let pool = db.pool().await;

        let result = execute_read_only(
            &pool,
            "SELECT TOP 10 ROW_NUMBER() OVER (ORDER BY object_id) AS n FROM sys.objects",
            3,
        )
        .await
        .expect("query");
        assert_eq!(result.rows.len(), 3);
        assert!(result.truncated);
    }
}

// =============================================================================
// Tool Tests
// =============================================================================

mod tool_tests {
    use super::*;

    async fn backend(db: &TestDatabase) -> Backend {
        let pool = db.pool().await;
        db.seed_schema(&pool).await;
        let config = db.config(TEST_DATABASE);
        Backend::sql(Arc::new(MssqlCatalog::new(pool, &config)), &config)
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_query_tool_returns_rows() {
        let db = TestDatabase::new().await;
        let backend = backend(&db).await;

        let args = json!({"sql": "SELECT id, name FROM dbo.customers"});
        let result = call_tool(&backend, "query", args.as_object().cloned())
            .await
            .expect("query tool");
        assert_ne!(result.is_error, Some(true));

        let rows: serde_json::Value = serde_json::from_str(&text_of(&result)).expect("JSON rows");
        assert_eq!(rows, json!([{"id": 1, "name": "Alice"}]));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    #[serial]
    async fn test_query_tool_reports_sql_errors_in_result() {
        let db = TestDatabase::new().await;
        let backend = backend(&db).await;

        let args = json!({"sql": "SELECT * FROM dbo.nope"});
        let result = call_tool(&backend, "query", args.as_object().cloned())
            .await
            .expect("tool-level failure is not a protocol fault");
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("nope"));
    }
}
