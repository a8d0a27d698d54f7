//! Column profilers.
//!
//! Each profiler owns its own snapshot of one column, fetched independently
//! of any [`TableProfile`](crate::table_profile::TableProfile), and computes a
//! fixed set of statistics for its [`ColumnFamily`]:
//!
//! - [`NumericColumn`]: counts, mean/median/min/max, database-side standard
//!   deviation and negative count, a binned histogram and a frequency table
//! - [`TextColumn`]: counts, database-side mode and character-class counts,
//!   value counts and a frequency table
//! - [`DateColumn`]: counts, database-side range, weekday/weekend, future and
//!   sentinel date counts, a per-day bar chart and a frequency table
//!
//! ## Lifecycle
//!
//! ```text
//! NotLoaded --load--> Empty           (no non-missing value: nothing more is computed)
//!           --load--> Loaded --compute--> StatsComputed
//! ```
//!
//! `compute` collects every statistic before committing any of them, so a
//! failed query leaves the profiler in `Loaded` with no partial results.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::queries;
use crate::sources::Session;
use crate::types::{TableHandle, Value};

pub mod classifier;
pub mod date;
pub mod numeric;
pub mod stats;
pub mod text;
pub mod types;

pub use classifier::{classify, ColumnFamilies, ColumnFamily};
pub use date::{DateColumn, DateStats};
pub use numeric::{coerce_numeric, NumericColumn, NumericStats};
pub use text::{TextColumn, TextStats};
pub use types::{
    Bar, BarChart, FrequencyTable, FrequentValue, Histogram, HistogramBucket, Summary,
    SummaryEntry,
};

/// Where a profiler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProfileState {
    /// No data fetched yet
    NotLoaded,
    /// Fetched, but the column holds no non-missing value
    Empty,
    /// Values fetched, statistics not computed
    Loaded,
    /// Every statistic computed
    StatsComputed,
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileState::NotLoaded => "NotLoaded",
            ProfileState::Empty => "Empty",
            ProfileState::Loaded => "Loaded",
            ProfileState::StatsComputed => "StatsComputed",
        };
        write!(f, "{name}")
    }
}

/// A column of a schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnRef {
    pub table: TableHandle,
    pub column: String,
}

impl ColumnRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: TableHandle::new(schema, table),
            column: column.into(),
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.table.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table.table_name
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Behavior shared by the numeric, text and date profilers.
#[async_trait]
pub trait ColumnProfiler: Send {
    /// The profiled column.
    fn column(&self) -> &ColumnRef;

    /// The family this profiler handles.
    fn family(&self) -> ColumnFamily;

    fn state(&self) -> ProfileState;

    /// True when the column was loaded and holds no non-missing value.
    fn is_empty(&self) -> bool {
        self.state() == ProfileState::Empty
    }

    /// Fetches the column's values.
    async fn load(&mut self, session: &mut Session) -> Result<ProfileState>;

    /// Runs every statistic. Does nothing on an empty column.
    async fn compute(&mut self, session: &mut Session, config: &ExplorerConfig) -> Result<()>;

    /// Display-ready statistics. Fails unless the state is `StatsComputed`.
    fn summary(&self) -> Result<Summary>;

    /// The top-N frequency table. Fails unless the state is `StatsComputed`.
    fn frequent(&self) -> Result<&FrequencyTable>;
}

/// Fetches every value of one column.
pub(crate) async fn fetch_column(session: &mut Session, column: &ColumnRef) -> Result<Vec<Value>> {
    let sql = queries::column_query(column.schema_name(), column.table_name(), &column.column);
    let result = session.run("column", sql).await?;
    if result.num_columns() != 1 {
        return Err(ExplorerError::invalid_data(format!(
            "expected one column for {column}, got {}",
            result.num_columns()
        )));
    }
    Ok(result.column_values(0))
}

/// State after loading `values`.
pub(crate) fn loaded_state(values: &[Value]) -> ProfileState {
    if values.iter().all(Value::is_missing) {
        ProfileState::Empty
    } else {
        ProfileState::Loaded
    }
}

/// Rejects `compute` before a successful `load`.
pub(crate) fn ensure_loaded(column: &ColumnRef, state: ProfileState) -> Result<()> {
    match state {
        ProfileState::Loaded | ProfileState::StatsComputed | ProfileState::Empty => Ok(()),
        ProfileState::NotLoaded => Err(ExplorerError::stats_unavailable(column.to_string(), state)),
    }
}

/// Returns the computed statistics or a `StatsUnavailable` error.
pub(crate) fn computed<'a, T>(
    column: &ColumnRef,
    state: ProfileState,
    stats: Option<&'a T>,
) -> Result<&'a T> {
    match (state, stats) {
        (ProfileState::StatsComputed, Some(stats)) => Ok(stats),
        _ => Err(ExplorerError::stats_unavailable(column.to_string(), state)),
    }
}

/// Runs one database-side count query.
pub(crate) async fn db_count(session: &mut Session, operation: &str, sql: Option<String>) -> Result<u64> {
    session.run(operation, sql).await?.scalar_count()
}
