//! Explorer configuration.

use std::time::Duration;

use crate::error::{ExplorerError, Result};
use crate::logging::LogConfig;

/// Upper bound accepted for `histogram_max_bins`.
pub const MAX_HISTOGRAM_BINS: usize = 1000;

/// Tunables shared by every profiling pass.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Number of entries kept in frequency tables
    pub top_n: usize,
    /// Maximum number of histogram bins for numeric columns
    pub histogram_max_bins: usize,
    /// Default row count for head/tail/sample previews
    pub preview_rows: usize,
    /// Schemas hidden from `list_tables`
    pub excluded_schemas: Vec<String>,
    /// Per-query timeout enforced at the client boundary
    pub query_timeout: Option<Duration>,
    /// Logging behavior
    pub log: LogConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            histogram_max_bins: 50,
            preview_rows: 5,
            excluded_schemas: vec!["information_schema".to_string(), "pg_catalog".to_string()],
            query_timeout: None,
            log: LogConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(ExplorerError::Configuration(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.histogram_max_bins == 0 || self.histogram_max_bins > MAX_HISTOGRAM_BINS {
            return Err(ExplorerError::Configuration(format!(
                "histogram_max_bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {}",
                self.histogram_max_bins
            )));
        }
        if self.query_timeout == Some(Duration::ZERO) {
            return Err(ExplorerError::Configuration(
                "query_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
