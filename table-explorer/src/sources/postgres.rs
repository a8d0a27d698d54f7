//! PostgreSQL [`TableSource`] built on sqlx.
//!
//! Statements run over the simple-query protocol (`sqlx::raw_sql`), so every
//! value comes back in PostgreSQL's text format and is decoded by
//! [`decode_text`] according to the column's type name.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Executor, Postgres, Row, Statement, TypeInfo};
use tracing::{debug, info, instrument};

use super::{SourceSession, TableSource};
use crate::error::{ExplorerError, Result};
use crate::security::SecureString;
use crate::types::{QueryResult, Value};

const SOURCE_TYPE: &str = "PostgreSQL";

/// Connection parameters for [`PostgresSource`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: SecureString,
    /// libpq-style `sslmode` (`disable`, `prefer`, `require`, ...)
    pub sslmode: Option<String>,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: SecureString::new("password"),
            sslmode: None,
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PostgresConfig {
    fn connect_options(&self) -> Result<PgConnectOptions> {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(self.password.expose());
        if let Some(mode) = &self.sslmode {
            let mode = PgSslMode::from_str(mode)
                .map_err(|e| ExplorerError::Configuration(format!("invalid sslmode: {e}")))?;
            options = options.ssl_mode(mode);
        }
        Ok(options)
    }
}

/// A [`TableSource`] backed by a lazily connected PostgreSQL pool.
///
/// ```rust,no_run
/// use table_explorer::sources::{PostgresConfig, PostgresSource};
///
/// let source = PostgresSource::new(PostgresConfig {
///     database: "hr".to_string(),
///     ..Default::default()
/// })
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PostgresSource {
    config: PostgresConfig,
    pool: PgPool,
}

impl PostgresSource {
    /// Creates the source. No connection is made until the first session opens.
    pub fn new(config: PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(config.connect_options()?);
        Ok(Self { config, pool })
    }
}

#[async_trait]
impl TableSource for PostgresSource {
    #[instrument(skip(self), fields(host = %self.config.host, database = %self.config.database))]
    async fn open(&self) -> Result<Box<dyn SourceSession>> {
        let conn = self.pool.acquire().await.map_err(|e| {
            ExplorerError::connection_with_source(
                SOURCE_TYPE,
                format!(
                    "cannot connect to {}:{}/{}",
                    self.config.host, self.config.port, self.config.database
                ),
                Box::new(e),
            )
        })?;
        info!("Acquired PostgreSQL connection");
        Ok(Box::new(PostgresSession { conn }))
    }

    fn description(&self) -> String {
        format!(
            "PostgreSQL {}@{}:{}/{}",
            self.config.username, self.config.host, self.config.port, self.config.database
        )
    }
}

struct PostgresSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl SourceSession for PostgresSession {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let query_error =
            |e: sqlx::Error| ExplorerError::query_with_source(sql, e.to_string(), Box::new(e));

        let rows: Vec<PgRow> = sqlx::raw_sql(sql)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(query_error)?;

        let Some(first) = rows.first() else {
            let statement = (&mut *self.conn).prepare(sql).await.map_err(query_error)?;
            let columns = statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            return Ok(QueryResult::new(columns, Vec::new()));
        };

        let columns: Vec<String> = first.columns().iter().map(|c| c.name().to_string()).collect();
        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, column) in row.columns().iter().enumerate() {
                let text: Option<String> = row.try_get_unchecked(idx).map_err(query_error)?;
                values.push(match text {
                    Some(text) => decode_text(column.type_info().name(), &text),
                    None => Value::Null,
                });
            }
            result.push(values);
        }
        Ok(QueryResult::new(columns, result))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        // Dropping the pooled connection hands it back to the pool.
        debug!("Released PostgreSQL connection");
        Ok(())
    }
}

/// Decodes a text-format value by its PostgreSQL type name.
///
/// Integers, floats, booleans and temporal types get typed values. Everything
/// else, including `NUMERIC` and `MONEY`, stays text and is parsed later by the
/// numeric coercion step. Values that do not parse (e.g. `infinity` dates) also
/// stay text.
pub fn decode_text(type_name: &str, text: &str) -> Value {
    let typed = match type_name {
        "INT2" | "INT4" | "INT8" | "OID" => text.parse().ok().map(Value::Integer),
        "FLOAT4" | "FLOAT8" => text.parse().ok().map(Value::Float),
        "BOOL" => match text {
            "t" => Some(Value::Boolean(true)),
            "f" => Some(Value::Boolean(false)),
            _ => None,
        },
        "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(Value::Date),
        "TIMESTAMP" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(Value::Timestamp),
        "TIMESTAMPTZ" => DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
            .ok()
            .map(|t| Value::TimestampTz(t.with_timezone(&Utc))),
        "TIME" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .ok()
            .map(Value::Time),
        _ => None,
    };
    typed.unwrap_or_else(|| Value::Text(text.to_string()))
}
