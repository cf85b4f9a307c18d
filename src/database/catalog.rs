//! Table catalog and read-only queries for the SQL backend.

use crate::config::DatabaseConfig;
use crate::database::connection::ConnectionPool;
use crate::database::guard::execute_read_only;
use crate::database::query::QueryResult;
use crate::error::ServerError;
use crate::pagination::{Cursor, Page};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// One column of a table, as exposed by the schema resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub column_name: String,
    pub data_type: String,
}

/// What the server needs from the relational backend.
#[async_trait]
pub trait SqlCatalog: Send + Sync {
    /// One page of table names, ordered by name.
    async fn list_tables(&self, cursor: Option<&Cursor>) -> Result<Page<String>, ServerError>;

    /// Columns of a table in ordinal order. Unknown tables have none.
    async fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>, ServerError>;

    /// Run caller SQL inside a rolled-back transaction.
    async fn query_read_only(&self, sql: &str) -> Result<QueryResult, ServerError>;
}

/// Page tokens carry the last table name of the previous page, hex-encoded.
fn encode_cursor(last_table: &str) -> String {
    last_table.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn decode_cursor(cursor: &Cursor) -> Result<String, ServerError> {
    let token = cursor.as_token();
    let invalid = || ServerError::InvalidCursor(token.to_string());

    if token.len() % 2 != 0 {
        return Err(invalid());
    }
    let bytes = (0..token.len())
        .step_by(2)
        .map(|i| {
            token
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(invalid)
        })
        .collect::<Result<Vec<u8>, _>>()?;
    String::from_utf8(bytes).map_err(|_| invalid())
}

const LIST_TABLES_SQL: &str = "SELECT TOP (@P1) TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = @P2 AND TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME > @P3 \
     ORDER BY TABLE_NAME";

const TABLE_COLUMNS_SQL: &str = "SELECT COLUMN_NAME, DATA_TYPE \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 \
     ORDER BY ORDINAL_POSITION";

/// SQL Server implementation over the connection pool.
pub struct MssqlCatalog {
    pool: ConnectionPool,
    schema: String,
    page_size: usize,
    max_rows: usize,
}

impl MssqlCatalog {
    pub fn new(pool: ConnectionPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            schema: config.schema.clone(),
            page_size: config.page_size.max(1),
            max_rows: config.max_result_rows,
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl SqlCatalog for MssqlCatalog {
    async fn list_tables(&self, cursor: Option<&Cursor>) -> Result<Page<String>, ServerError> {
        let after = match cursor {
            Some(c) => decode_cursor(c)?,
            None => String::new(),
        };
        // One extra row tells whether another page exists.
        let fetch = (self.page_size + 1) as i32;

        let mut conn = self.pool.get().await?;
        let rows = conn
            .query(LIST_TABLES_SQL, &[&fetch, &self.schema.as_str(), &after.as_str()])
            .await?
            .into_first_result()
            .await?;

        let mut tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get::<&str, _>(0).map(String::from))
            .collect();

        let next_cursor = if tables.len() > self.page_size {
            tables.truncate(self.page_size);
            tables.last().and_then(|t| Cursor::from_token(encode_cursor(t)))
        } else {
            None
        };

        debug!(
            "Listed {} tables in schema {} (more: {})",
            tables.len(),
            self.schema,
            next_cursor.is_some()
        );
        Ok(Page::new(tables, next_cursor))
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>, ServerError> {
        let mut conn = self.pool.get().await?;
        let rows = conn
            .query(TABLE_COLUMNS_SQL, &[&self.schema.as_str(), &table])
            .await?
            .into_first_result()
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(TableColumn {
                    column_name: row.get::<&str, _>(0)?.to_string(),
                    data_type: row.get::<&str, _>(1)?.to_string(),
                })
            })
            .collect())
    }

    async fn query_read_only(&self, sql: &str) -> Result<QueryResult, ServerError> {
        execute_read_only(&self.pool, sql, self.max_rows).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        for name in ["users", "Order Details", "ünïcode", ""] {
            let token = encode_cursor(name);
            let cursor = Cursor::from_token(token.clone());
            match cursor {
                Some(c) => assert_eq!(decode_cursor(&c).unwrap(), name),
                None => assert!(token.is_empty()),
            }
        }
    }

    #[test]
    fn test_bad_cursor_rejected() {
        for bad in ["abc", "zz", "ff"] {
            let cursor = Cursor::from_token(bad).unwrap();
            assert!(matches!(
                decode_cursor(&cursor),
                Err(ServerError::InvalidCursor(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_mock_paging_walks_all_tables() {
        let catalog = mock::MockCatalog {
            page_size: 2,
            ..Default::default()
        }
        .with_table("a", &[])
        .with_table("b", &[])
        .with_table("c", &[]);

        let first = catalog.list_tables(None).await.unwrap();
        assert_eq!(first.items, vec!["a", "b"]);
        let second = catalog
            .list_tables(first.next_cursor.as_ref())
            .await
            .unwrap();
        assert_eq!(second.items, vec!["c"]);
        assert!(second.next_cursor.is_none());
    }
}
