//! Read-only execution of caller-supplied SQL.
//!
//! Every statement runs inside an explicit transaction that is rolled back
//! afterwards, whatever happened. The connection lease is released when it
//! goes out of scope at the end of [`execute_read_only`], exactly once.
//!
//! Statements that commit implicitly or change session state outside the
//! transaction are not contained by this.

use crate::constants::LOG_QUERY_MAX_LEN;
use crate::database::connection::{ConnectionPool, PooledConn};
use crate::database::query::{truncate_for_log, QueryResult};
use crate::error::ServerError;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, warn};

/// A leased connection that can run statements inside a transaction.
#[async_trait]
pub trait TransactionalConnection: Send {
    async fn begin(&mut self) -> Result<(), ServerError>;

    async fn run(&mut self, sql: &str, max_rows: usize) -> Result<QueryResult, ServerError>;

    /// Roll back whatever transaction is open. No-op when none is.
    async fn rollback(&mut self) -> Result<(), ServerError>;
}

/// Something that hands out connection leases.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn acquire<'a>(&'a self)
        -> Result<Box<dyn TransactionalConnection + 'a>, ServerError>;
}

/// Run `sql` and roll back unconditionally.
///
/// A rollback failure is logged and never replaces the query outcome.
/// Statements that commit implicitly, or change session state outside the
/// transaction, are not undone.
pub async fn execute_read_only<S>(
    source: &S,
    sql: &str,
    max_rows: usize,
) -> Result<QueryResult, ServerError>
where
    S: ConnectionSource + ?Sized,
{
    debug!("Executing read-only query: {}", truncate_for_log(sql, LOG_QUERY_MAX_LEN));

    let mut conn = source.acquire().await?;

    let outcome = match conn.begin().await {
        Ok(()) => conn.run(sql, max_rows).await,
        Err(e) => Err(e),
    };

    if let Err(e) = conn.rollback().await {
        let failure = ServerError::RollbackFailure(e.to_string());
        warn!("{}", failure);
    }

    drop(conn);

    match &outcome {
        Ok(result) => debug!(
            "Query completed: {} rows in {} ms",
            result.rows.len(),
            result.execution_time_ms
        ),
        Err(e) => debug!("Query failed: {}", e),
    }

    outcome
}

/// A pooled tiberius connection.
struct PooledTransaction<'a> {
    conn: PooledConn<'a>,
}

#[async_trait]
impl TransactionalConnection for PooledTransaction<'_> {
    async fn begin(&mut self) -> Result<(), ServerError> {
        self.conn
            .simple_query("BEGIN TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn run(&mut self, sql: &str, max_rows: usize) -> Result<QueryResult, ServerError> {
        let start = Instant::now();
        let stream = self.conn.simple_query(sql).await?;
        QueryResult::collect(stream, max_rows, start).await
    }

    async fn rollback(&mut self) -> Result<(), ServerError> {
        self.conn
            .simple_query("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionSource for ConnectionPool {
    async fn acquire<'a>(
        &'a self,
    ) -> Result<Box<dyn TransactionalConnection + 'a>, ServerError> {
        let conn = self.get().await?;
        Ok(Box::new(PooledTransaction { conn }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
        begun: AtomicUsize,
        ran: AtomicUsize,
        rolled_back: AtomicUsize,
    }

    #[derive(Clone, Copy, Default)]
    struct Faults {
        begin: bool,
        run: bool,
        rollback: bool,
    }

    struct MockConn {
        counters: Arc<Counters>,
        faults: Faults,
    }

    impl Drop for MockConn {
        fn drop(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TransactionalConnection for MockConn {
        async fn begin(&mut self) -> Result<(), ServerError> {
            self.counters.begun.fetch_add(1, Ordering::SeqCst);
            if self.faults.begin {
                return Err(ServerError::connection("begin failed"));
            }
            Ok(())
        }

        async fn run(&mut self, _sql: &str, _max_rows: usize) -> Result<QueryResult, ServerError> {
            self.counters.ran.fetch_add(1, Ordering::SeqCst);
            if self.faults.run {
                return Err(ServerError::backend("SQL Server error 208: Invalid object name"));
            }
            Ok(QueryResult::empty())
        }

        async fn rollback(&mut self) -> Result<(), ServerError> {
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
            if self.faults.rollback {
                return Err(ServerError::connection("connection reset"));
            }
            Ok(())
        }
    }

    struct MockSource {
        counters: Arc<Counters>,
        faults: Faults,
    }

    impl MockSource {
        fn new(faults: Faults) -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                faults,
            }
        }

        fn assert_lifecycle(&self) {
            let c = &self.counters;
            assert_eq!(c.acquired.load(Ordering::SeqCst), 1);
            assert_eq!(c.released.load(Ordering::SeqCst), 1);
            assert_eq!(c.rolled_back.load(Ordering::SeqCst), 1);
        }
    }

    #[async_trait]
    impl ConnectionSource for MockSource {
        async fn acquire<'a>(
            &'a self,
        ) -> Result<Box<dyn TransactionalConnection + 'a>, ServerError> {
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockConn {
                counters: Arc::clone(&self.counters),
                faults: self.faults,
            }))
        }
    }

    #[tokio::test]
    async fn test_success_rolls_back_and_releases() {
        let source = MockSource::new(Faults::default());
        let result = execute_read_only(&source, "SELECT 1", 10).await;
        assert!(result.is_ok());
        source.assert_lifecycle();
        assert_eq!(source.counters.ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_failure_still_rolls_back() {
        let source = MockSource::new(Faults {
            run: true,
            ..Default::default()
        });
        let err = execute_read_only(&source, "SELECT * FROM nope", 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("208"));
        source.assert_lifecycle();
    }

    #[tokio::test]
    async fn test_begin_failure_skips_query() {
        let source = MockSource::new(Faults {
            begin: true,
            ..Default::default()
        });
        let err = execute_read_only(&source, "SELECT 1", 10).await.unwrap_err();
        assert!(err.to_string().contains("begin failed"));
        assert_eq!(source.counters.ran.load(Ordering::SeqCst), 0);
        source.assert_lifecycle();
    }

    #[tokio::test]
    async fn test_rollback_failure_does_not_mask_result() {
        let source = MockSource::new(Faults {
            rollback: true,
            ..Default::default()
        });
        assert!(execute_read_only(&source, "SELECT 1", 10).await.is_ok());
        source.assert_lifecycle();

        let source = MockSource::new(Faults {
            run: true,
            rollback: true,
            ..Default::default()
        });
        let err = execute_read_only(&source, "SELECT 1", 10).await.unwrap_err();
        assert!(matches!(err, ServerError::Backend { .. }));
        source.assert_lifecycle();
    }
}
