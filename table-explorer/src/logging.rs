//! Logging for profiling passes.
//!
//! The explorer only emits `tracing` events; whether anything is printed is up
//! to the subscriber the application installs. [`LogConfig`] decides which
//! events a pass emits, and [`init_logging`] is a convenience for binaries and
//! tests that do not configure `tracing-subscriber` themselves.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{ExplorerError, Result};

/// Which profiling events are emitted.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Emit a debug event for every statement sent to the source
    pub log_queries: bool,
    /// Emit an info event with the statistics of each finished pass
    pub log_statistics: bool,
    /// SQL text longer than this is cut in log events
    pub max_sql_length: usize,
    /// Statements slower than this are reported at warn level
    pub slow_query_threshold: Option<Duration>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            log_statistics: true,
            max_sql_length: 256,
            slow_query_threshold: Some(Duration::from_secs(5)),
        }
    }
}

impl LogConfig {
    /// Every statement and every pass, with full SQL text.
    pub fn verbose() -> Self {
        Self {
            log_queries: true,
            log_statistics: true,
            max_sql_length: usize::MAX,
            slow_query_threshold: Some(Duration::from_secs(1)),
        }
    }

    /// Only slow statements and failures.
    pub fn quiet() -> Self {
        Self {
            log_queries: false,
            log_statistics: false,
            max_sql_length: 128,
            ..Default::default()
        }
    }

    /// Whether a statement that took `elapsed` counts as slow.
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_query_threshold
            .is_some_and(|threshold| elapsed >= threshold)
    }
}

/// Logs a statement at debug level when query logging is enabled.
#[macro_export]
macro_rules! log_query {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_queries {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs computed statistics at info level when enabled.
#[macro_export]
macro_rules! log_stats {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_statistics {
            tracing::info!($($arg)*);
        }
    };
}

/// Shortens SQL text for log events, on a char boundary.
pub fn truncate_sql(sql: &str, max_length: usize) -> String {
    if sql.len() <= max_length {
        return sql.to_string();
    }
    let mut end = max_length;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &sql[..end])
}

/// Output format of [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Filter used when `RUST_LOG` is unset: `level` for everything, debug for
/// this crate.
pub fn default_filter(level: tracing::Level) -> String {
    format!("{},table_explorer=debug", level.as_str().to_lowercase())
}

/// Installs a global subscriber. `RUST_LOG` takes precedence over `filter`.
///
/// ```rust,no_run
/// use table_explorer::logging::{default_filter, init_logging, LogFormat};
///
/// init_logging(LogFormat::Json, &default_filter(tracing::Level::WARN)).unwrap();
/// ```
pub fn init_logging(format: LogFormat, filter: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ExplorerError::Configuration(format!("cannot install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = LogConfig::default();
        assert!(!config.log_queries);
        assert!(config.log_statistics);

        let config = LogConfig::verbose();
        assert!(config.log_queries);
        assert!(config.is_slow(Duration::from_secs(2)));

        let config = LogConfig::quiet();
        assert!(!config.log_statistics);
        assert!(!config.is_slow(Duration::from_millis(10)));
    }

    #[test]
    fn test_no_threshold_is_never_slow() {
        let config = LogConfig {
            slow_query_threshold: None,
            ..Default::default()
        };
        assert!(!config.is_slow(Duration::from_secs(3600)));
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("select 1", 10), "select 1");
        assert_eq!(
            truncate_sql("select * from public.employees", 10),
            "select * f...(truncated)"
        );
        // never splits a multi-byte character
        assert_eq!(truncate_sql("ééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter(tracing::Level::INFO),
            "info,table_explorer=debug"
        );
    }
}
