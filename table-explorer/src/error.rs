//! Error types for the table explorer.
//!
//! All fallible operations return [`ExplorerError`]. An empty table or an
//! all-null column is deliberately *not* an error: it is reported through the
//! `Empty` state of the profile instead.

use std::time::Duration;

use thiserror::Error;

/// The main error type for the table explorer.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// The data source could not be reached or authenticated.
    #[error("Connection to {source_type} failed: {message}")]
    Connection {
        /// Kind of backend (e.g. "PostgreSQL", "DataFusion")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A query was rejected or failed while executing.
    #[error("Query failed: {message} (sql: {sql})")]
    Query {
        /// The statement that failed
        sql: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A query did not complete within the configured timeout.
    #[error("Query timed out after {timeout:?} (sql: {sql})")]
    QueryTimeout { sql: String, timeout: Duration },

    /// A query builder was given a missing or invalid identifier.
    #[error("Could not build {operation} query: missing or invalid identifier")]
    MalformedQuery { operation: String },

    /// A value in a numeric column could not be parsed as a number.
    #[error("Cannot coerce value '{value}' in column '{column}' to {target}")]
    Coercion {
        column: String,
        value: String,
        target: String,
    },

    /// Statistics were requested from a profile that has not computed them.
    #[error("Statistics for '{target}' are not available in state {state}")]
    StatsUnavailable { target: String, state: String },

    /// `sample(n)` asked for more rows than the table holds.
    #[error("Cannot sample {requested} rows without replacement from {available} rows")]
    SampleTooLarge { requested: usize, available: usize },

    /// A query result did not have the expected shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ExplorerError>`.
///
/// ```rust
/// use table_explorer::error::Result;
///
/// fn count_rows() -> Result<u64> {
///     Ok(42)
/// }
/// # assert_eq!(count_rows().unwrap(), 42);
/// ```
pub type Result<T> = std::result::Result<T, ExplorerError>;

impl ExplorerError {
    /// Creates a new connection error.
    pub fn connection(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new connection error with a source error.
    pub fn connection_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Connection {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new query error.
    pub fn query(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            sql: sql.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new query error with a source error.
    pub fn query_with_source(
        sql: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Query {
            sql: sql.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a malformed query error for the named query builder.
    pub fn malformed_query(operation: impl Into<String>) -> Self {
        Self::MalformedQuery {
            operation: operation.into(),
        }
    }

    /// Creates a coercion error.
    pub fn coercion(
        column: impl Into<String>,
        value: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            column: column.into(),
            value: value.into(),
            target: target.into(),
        }
    }

    /// Creates an error for reading statistics in the wrong state.
    pub fn stats_unavailable(target: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::StatsUnavailable {
            target: target.into(),
            state: state.to_string(),
        }
    }

    /// Creates an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ExplorerError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            ExplorerError::Internal(inner) => ExplorerError::Internal(format!("{msg}: {inner}")),
            other => ExplorerError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            ExplorerError::Internal(format!("{}: {}", msg, e.into()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExplorerError::query("select 1", "boom");
        assert_eq!(err.to_string(), "Query failed: boom (sql: select 1)");

        let err = ExplorerError::coercion("salary", "abc", "number");
        assert_eq!(
            err.to_string(),
            "Cannot coerce value 'abc' in column 'salary' to number"
        );

        let err = ExplorerError::SampleTooLarge {
            requested: 10,
            available: 3,
        };
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ExplorerError::connection_with_source("PostgreSQL", "cannot connect", Box::new(io));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("PostgreSQL"));
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), ExplorerError> =
            Err(ExplorerError::invalid_data("no rows"));
        let err = result.context("loading employees").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Internal error: loading employees: Invalid data: no rows"
        );

        let result: std::result::Result<(), ExplorerError> =
            Err(ExplorerError::Internal("inner".to_string()));
        let err = result.with_context(|| "outer".to_string()).unwrap_err();
        assert!(err.to_string().contains("outer"));
    }
}
