//! Data source capability consumed by the profiling engine.
//!
//! A [`TableSource`] hands out [`SourceSession`]s. One session is one scoped
//! connection: it is opened at the start of a load or profiling pass, every
//! query of that pass runs through it, and it is closed when the pass ends,
//! whether the pass succeeded or not.
//!
//! The engine never talks to a raw session directly. It wraps it in a
//! [`Session`], which adds the optional client-side timeout, query logging and
//! the check for queries that could not be built.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ExplorerError, Result};
use crate::log_query;
use crate::logging::{truncate_sql, LogConfig};
use crate::queries;
use crate::types::QueryResult;

mod datafusion;
#[cfg(feature = "postgres")]
mod postgres;

pub use self::datafusion::DataFusionSource;
#[cfg(feature = "postgres")]
pub use self::postgres::{decode_text, PostgresConfig, PostgresSource};

/// A relational backend that can execute SQL.
///
/// # Examples
///
/// ```rust
/// use table_explorer::sources::{DataFusionSource, SourceSession, TableSource};
/// use datafusion::prelude::SessionContext;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let source = DataFusionSource::new(SessionContext::new());
/// let session = source.open().await.unwrap();
/// session.close().await.unwrap();
/// # })
/// ```
#[async_trait]
pub trait TableSource: Debug + Send + Sync {
    /// Acquires a connection. Fails with [`ExplorerError::Connection`] when
    /// the backend cannot be reached or authenticated.
    async fn open(&self) -> Result<Box<dyn SourceSession>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// An open connection to a [`TableSource`].
#[async_trait]
pub trait SourceSession: Send {
    /// Executes one statement and returns its rows with column names.
    async fn execute(&mut self, sql: &str) -> Result<QueryResult>;

    /// Releases the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A [`SourceSession`] wrapped with the explorer's query policy.
pub struct Session {
    inner: Box<dyn SourceSession>,
    timeout: Option<Duration>,
    log: LogConfig,
    queries_executed: usize,
}

impl Session {
    pub fn new(inner: Box<dyn SourceSession>, timeout: Option<Duration>, log: LogConfig) -> Self {
        Self {
            inner,
            timeout,
            log,
            queries_executed: 0,
        }
    }

    /// Opens a session on `source`.
    pub async fn open(
        source: &dyn TableSource,
        timeout: Option<Duration>,
        log: LogConfig,
    ) -> Result<Self> {
        let inner = source.open().await?;
        debug!(source = %source.description(), "Opened session");
        Ok(Self::new(inner, timeout, log))
    }

    /// Number of statements executed so far.
    pub fn queries_executed(&self) -> usize {
        self.queries_executed
    }

    /// Executes a statement, enforcing the configured timeout.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let logged_sql = truncate_sql(sql, self.log.max_sql_length);
        log_query!(self.log, sql = %logged_sql, "Executing query");

        let start = Instant::now();
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.inner.execute(sql))
                .await
                .map_err(|_| ExplorerError::QueryTimeout {
                    sql: sql.to_string(),
                    timeout,
                })?,
            None => self.inner.execute(sql).await,
        };
        self.queries_executed += 1;

        let elapsed = start.elapsed();
        if self.log.is_slow(elapsed) {
            warn!(sql = %logged_sql, elapsed_ms = elapsed.as_millis() as u64, "Slow query");
        }
        match &result {
            Ok(rows) => log_query!(
                self.log,
                sql = %logged_sql,
                rows = rows.num_rows(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Query completed"
            ),
            Err(e) => warn!(sql = %logged_sql, error = %e, "Query failed"),
        }
        result
    }

    /// Executes the output of a query builder, rejecting an absent query.
    pub async fn run(&mut self, operation: &str, sql: Option<String>) -> Result<QueryResult> {
        let sql = sql.ok_or_else(|| ExplorerError::malformed_query(operation))?;
        self.query(&sql).await
    }

    /// Lists `schema.table` names, skipping the excluded schemas.
    pub async fn list_tables(&mut self, excluded_schemas: &[String]) -> Result<Vec<String>> {
        let result = self.query(&queries::tables_list_query()).await?;
        let (Some(schema_idx), Some(table_idx)) = (
            result.column_index("table_schema"),
            result.column_index("table_name"),
        ) else {
            return Err(ExplorerError::invalid_data(
                "table listing must return table_schema and table_name columns",
            ));
        };
        let mut tables = Vec::with_capacity(result.num_rows());
        for row in &result.rows {
            let (Some(schema), Some(table)) = (row.get(schema_idx), row.get(table_idx)) else {
                return Err(ExplorerError::invalid_data("short row in table listing"));
            };
            let schema = schema.to_string();
            if excluded_schemas.iter().any(|s| *s == schema) {
                continue;
            }
            tables.push(format!("{schema}.{table}"));
        }
        Ok(tables)
    }

    /// Releases the underlying connection.
    pub async fn close(self) -> Result<()> {
        debug!(queries = self.queries_executed, "Closing session");
        self.inner.close().await
    }

    /// Closes the session and returns `result`. An error from the pass wins
    /// over an error from closing.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        let closed = self.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "Failed to close session after error");
                Err(e)
            }
            (Ok(_), Err(close_err)) => Err(close_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Recorder {
        sql: Mutex<Vec<String>>,
        closed: Mutex<usize>,
    }

    struct FixedSession {
        recorder: Arc<Recorder>,
        result: QueryResult,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl SourceSession for FixedSession {
        async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.recorder.sql.lock().unwrap().push(sql.to_string());
            Ok(self.result.clone())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            *self.recorder.closed.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn session(result: QueryResult, delay: Option<Duration>, timeout: Option<Duration>) -> (Session, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let inner = FixedSession {
            recorder: recorder.clone(),
            result,
            delay,
        };
        (Session::new(Box::new(inner), timeout, LogConfig::verbose()), recorder)
    }

    #[tokio::test]
    async fn test_list_tables_excludes_system_schemas() {
        let listing = QueryResult::new(
            vec!["table_schema".into(), "table_name".into()],
            vec![
                vec![Value::from("information_schema"), Value::from("columns")],
                vec![Value::from("pg_catalog"), Value::from("pg_class")],
                vec![Value::from("public"), Value::from("employees")],
                vec![Value::from("sales"), Value::from("orders")],
            ],
        );
        let (mut session, recorder) = session(listing, None, None);
        let excluded = vec!["information_schema".to_string(), "pg_catalog".to_string()];
        let tables = session.list_tables(&excluded).await.unwrap();
        assert_eq!(tables, vec!["public.employees", "sales.orders"]);

        session.close().await.unwrap();
        assert_eq!(*recorder.closed.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_tables_reads_columns_by_name() {
        let listing = QueryResult::new(
            vec!["table_name".into(), "table_schema".into()],
            vec![vec![Value::from("orders"), Value::from("sales")]],
        );
        let (mut session, _) = session(listing, None, None);
        assert_eq!(session.list_tables(&[]).await.unwrap(), vec!["sales.orders"]);

        let listing = QueryResult::new(
            vec!["schemaname".into(), "tablename".into()],
            vec![vec![Value::from("sales"), Value::from("orders")]],
        );
        let (mut session, _) = self::session(listing, None, None);
        assert!(matches!(
            session.list_tables(&[]).await,
            Err(ExplorerError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_absent_query_is_not_executed() {
        let (mut session, recorder) = session(QueryResult::default(), None, None);
        let err = session.run("unique", None).await.unwrap_err();
        assert!(matches!(err, ExplorerError::MalformedQuery { .. }));
        assert!(recorder.sql.lock().unwrap().is_empty());
        assert_eq!(session.queries_executed(), 0);
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let (mut session, _) = session(
            QueryResult::default(),
            Some(Duration::from_millis(200)),
            Some(Duration::from_millis(10)),
        );
        let err = session.query("select 1").await.unwrap_err();
        assert!(matches!(err, ExplorerError::QueryTimeout { .. }));
    }

    #[tokio::test]
    async fn test_finish_closes_on_error() {
        let (session, recorder) = session(QueryResult::default(), None, None);
        let result: Result<()> = Err(ExplorerError::invalid_data("boom"));
        let err = session.finish(result).await.unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidData(_)));
        assert_eq!(*recorder.closed.lock().unwrap(), 1);
    }
}
