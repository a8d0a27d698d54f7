//! Date and time column profiler.
//!
//! Range, weekday/weekend, future and sentinel date counts are all evaluated
//! by the database. `future_count` compares against the database's
//! `current_date` when the query runs, not when the column was loaded.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use super::stats;
use super::types::{Bar, BarChart, FrequencyTable, Summary};
use super::{
    computed, db_count, ensure_loaded, fetch_column, loaded_state, ColumnFamily, ColumnProfiler,
    ColumnRef, ProfileState,
};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::formatters::format_count;
use crate::log_stats;
use crate::queries;
use crate::sources::Session;
use crate::types::Value;

/// Placeholder dates commonly used instead of NULL.
pub fn sentinel_dates() -> [NaiveDate; 2] {
    [
        NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default(),
    ]
}

/// Statistics of a date/time column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateStats {
    pub unique_count: u64,
    pub missing_count: u64,
    pub min: Value,
    pub max: Value,
    pub weekend_count: u64,
    pub weekday_count: u64,
    pub future_count: u64,
    pub epoch_1900_count: u64,
    pub epoch_1970_count: u64,
    /// Values per calendar day, in time order
    pub bars: BarChart,
    pub frequent: FrequencyTable,
}

/// Profiler for a column of the datetime family.
#[derive(Debug, Clone)]
pub struct DateColumn {
    column: ColumnRef,
    state: ProfileState,
    values: Vec<Value>,
    stats: Option<DateStats>,
}

impl DateColumn {
    pub fn new(column: ColumnRef) -> Self {
        Self {
            column,
            state: ProfileState::NotLoaded,
            values: Vec::new(),
            stats: None,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn stats(&self) -> Result<&DateStats> {
        computed(&self.column, self.state, self.stats.as_ref())
    }

    pub fn bar_chart(&self) -> Result<&BarChart> {
        Ok(&self.stats()?.bars)
    }
}

/// Calendar day of a temporal value. Time-of-day and interval values are
/// their own bucket.
fn day_bucket(value: &Value) -> Value {
    match value {
        Value::Timestamp(t) => Value::Date(t.date()),
        Value::TimestampTz(t) => Value::Date(t.date_naive()),
        other => other.clone(),
    }
}

/// Counts values per calendar day, ordered by day.
pub fn daily_bars(values: &[Value]) -> BarChart {
    let mut counts: HashMap<Value, u64> = HashMap::new();
    for value in values.iter().filter(|v| !v.is_missing()) {
        *counts.entry(day_bucket(value)).or_insert(0) += 1;
    }
    let mut bars: Vec<Bar> = counts
        .into_iter()
        .map(|(key, count)| Bar { key, count })
        .collect();
    bars.sort_by(|a, b| a.key.cmp(&b.key));
    BarChart { bars }
}

#[async_trait]
impl ColumnProfiler for DateColumn {
    fn column(&self) -> &ColumnRef {
        &self.column
    }

    fn family(&self) -> ColumnFamily {
        ColumnFamily::Datetime
    }

    fn state(&self) -> ProfileState {
        self.state
    }

    #[instrument(skip(self, session), fields(column = %self.column))]
    async fn load(&mut self, session: &mut Session) -> Result<ProfileState> {
        self.values = fetch_column(session, &self.column).await?;
        self.state = loaded_state(&self.values);
        self.stats = None;
        info!(rows = self.values.len(), state = %self.state, "Loaded date column");
        Ok(self.state)
    }

    #[instrument(skip(self, session, config), fields(column = %self.column))]
    async fn compute(&mut self, session: &mut Session, config: &ExplorerConfig) -> Result<()> {
        ensure_loaded(&self.column, self.state)?;
        if self.state == ProfileState::Empty {
            return Ok(());
        }
        let (schema, table, col) = (
            self.column.schema_name(),
            self.column.table_name(),
            self.column.column.as_str(),
        );
        let [epoch_1900, epoch_1970] = sentinel_dates();

        let unique_count = stats::distinct_count(&self.values);
        let missing_count = stats::missing_count(&self.values);
        let min = session
            .run("min", queries::min_query(schema, table, col))
            .await?
            .scalar()?
            .clone();
        let max = session
            .run("max", queries::max_query(schema, table, col))
            .await?
            .scalar()?
            .clone();
        let weekend_count =
            db_count(session, "weekend", queries::weekend_query(schema, table, col)).await?;
        let weekday_count =
            db_count(session, "weekday", queries::weekday_query(schema, table, col)).await?;
        let future_count =
            db_count(session, "future", queries::future_query(schema, table, col)).await?;
        let epoch_1900_count = db_count(
            session,
            "1900-01-01",
            queries::sentinel_date_query(epoch_1900, schema, table, col),
        )
        .await?;
        let epoch_1970_count = db_count(
            session,
            "1970-01-01",
            queries::sentinel_date_query(epoch_1970, schema, table, col),
        )
        .await?;
        if min.is_null() || max.is_null() {
            return Err(ExplorerError::invalid_data(format!(
                "{} has values but the database reports no minimum or maximum",
                self.column
            )));
        }

        let bars = daily_bars(&self.values);
        let frequent = stats::frequency_table(&self.values, config.top_n);

        log_stats!(
            config.log,
            column = %self.column,
            unique_count,
            missing_count,
            future_count,
            min = %min,
            max = %max,
            "Computed date statistics"
        );
        self.stats = Some(DateStats {
            unique_count,
            missing_count,
            min,
            max,
            weekend_count,
            weekday_count,
            future_count,
            epoch_1900_count,
            epoch_1970_count,
            bars,
            frequent,
        });
        self.state = ProfileState::StatsComputed;
        Ok(())
    }

    fn summary(&self) -> Result<Summary> {
        let s = self.stats()?;
        Ok(Summary::new()
            .with("Number of Unique Values", format_count(s.unique_count))
            .with("Number of Rows with Missing Values", format_count(s.missing_count))
            .with("Number of Weekend Dates", format_count(s.weekend_count))
            .with("Number of Weekday Dates", format_count(s.weekday_count))
            .with("Number of Dates in Future", format_count(s.future_count))
            .with("Number of Rows with 1900-01-01", format_count(s.epoch_1900_count))
            .with("Number of Rows with 1970-01-01", format_count(s.epoch_1970_count))
            .with("Minimum Value", s.min.to_string())
            .with("Maximum Value", s.max.to_string()))
    }

    fn frequent(&self) -> Result<&FrequencyTable> {
        Ok(&self.stats()?.frequent)
    }
}
