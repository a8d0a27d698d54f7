//! Numeric column profiler.
//!
//! Distinct count, standard deviation and negative count run in the database
//! (`COUNT(DISTINCT)`, `STDDEV`, `WHERE col < 0`). Everything else is computed
//! from the loaded values.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use super::stats;
use super::types::{FrequencyTable, Histogram, Summary};
use super::{
    computed, db_count, ensure_loaded, fetch_column, loaded_state, ColumnFamily, ColumnProfiler,
    ColumnRef, ProfileState,
};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::formatters::{format_count, format_decimal};
use crate::log_stats;
use crate::queries;
use crate::sources::Session;
use crate::types::Value;

/// Statistics of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub unique_count: u64,
    pub missing_count: u64,
    pub mean: f64,
    /// Sample standard deviation; `None` when the database returns NULL (one row)
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub zero_count: u64,
    pub negative_count: u64,
    pub histogram: Histogram,
    pub frequent: FrequencyTable,
}

/// Profiler for a column of the numeric family.
#[derive(Debug, Clone)]
pub struct NumericColumn {
    column: ColumnRef,
    state: ProfileState,
    values: Vec<Value>,
    stats: Option<NumericStats>,
}

impl NumericColumn {
    pub fn new(column: ColumnRef) -> Self {
        Self {
            column,
            state: ProfileState::NotLoaded,
            values: Vec::new(),
            stats: None,
        }
    }

    /// Loaded values after numeric coercion.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn stats(&self) -> Result<&NumericStats> {
        computed(&self.column, self.state, self.stats.as_ref())
    }

    pub fn histogram(&self) -> Result<&Histogram> {
        Ok(&self.stats()?.histogram)
    }
}

#[async_trait]
impl ColumnProfiler for NumericColumn {
    fn column(&self) -> &ColumnRef {
        &self.column
    }

    fn family(&self) -> ColumnFamily {
        ColumnFamily::Numeric
    }

    fn state(&self) -> ProfileState {
        self.state
    }

    #[instrument(skip(self, session), fields(column = %self.column))]
    async fn load(&mut self, session: &mut Session) -> Result<ProfileState> {
        let raw = fetch_column(session, &self.column).await?;
        let values = coerce_numeric(&self.column.column, raw)?;
        self.state = loaded_state(&values);
        self.values = values;
        self.stats = None;
        info!(rows = self.values.len(), state = %self.state, "Loaded numeric column");
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
        let numbers = stats::numbers(&self.values);
        let no_values = || ExplorerError::invalid_data(format!("{} has no numeric values", self.column));

        let unique_count = db_count(session, "unique", queries::unique_query(schema, table, col)).await?;
        let missing_count = stats::missing_count(&self.values);
        let mean = stats::mean(&numbers).ok_or_else(no_values)?;
        let std_dev = session
            .run("std", queries::std_query(schema, table, col))
            .await?
            .scalar_f64()?;
        let min = stats::min(&numbers).ok_or_else(no_values)?;
        let max = stats::max(&numbers).ok_or_else(no_values)?;
        let median = stats::median(&numbers).ok_or_else(no_values)?;
        let zero_count = numbers.iter().filter(|v| **v == 0.0).count() as u64;
        let negative_count =
            db_count(session, "negative", queries::negative_query(schema, table, col)).await?;
        let histogram = stats::histogram(&numbers, config.histogram_max_bins);
        let frequent = stats::frequency_table(&self.values, config.top_n);

        log_stats!(
            config.log,
            column = %self.column,
            unique_count,
            missing_count,
            mean,
            negative_count,
            "Computed numeric statistics"
        );
        self.stats = Some(NumericStats {
            unique_count,
            missing_count,
            mean,
            std_dev,
            min,
            max,
            median,
            zero_count,
            negative_count,
            histogram,
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
            .with("Number of Rows with 0", format_count(s.zero_count))
            .with("Number of Rows with Negative Values", format_count(s.negative_count))
            .with("Average Value", format_decimal(s.mean, 3))
            .with(
                "Standard Deviation Value",
                s.std_dev.map_or_else(|| "n/a".to_string(), |v| format_decimal(v, 3)),
            )
            .with("Minimum Value", format_decimal(s.min, 3))
            .with("Maximum Value", format_decimal(s.max, 3))
            .with("Median Value", format_decimal(s.median, 3)))
    }

    fn frequent(&self) -> Result<&FrequencyTable> {
        Ok(&self.stats()?.frequent)
    }
}

enum Parsed {
    Int(i64),
    Float(f64),
}

fn parse_number(text: &str) -> Option<Parsed> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Parsed::Int(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Some(Parsed::Float(f));
    }
    // PostgreSQL money text, e.g. "-$1,234.50"
    let stripped: String = text.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    if stripped.len() != text.len() {
        return stripped.parse::<f64>().ok().map(Parsed::Float);
    }
    None
}

/// Converts loaded values to `Integer`/`Float`.
///
/// Text is parsed (blank text becomes NULL) and booleans become 0/1. If any
/// value is fractional the whole column becomes `Float`. A value that cannot
/// be read as a number is a [`ExplorerError::Coercion`] error.
pub fn coerce_numeric(column: &str, values: Vec<Value>) -> Result<Vec<Value>> {
    let mut any_float = false;
    let mut coerced = Vec::with_capacity(values.len());
    for value in values {
        let number = match value {
            Value::Null => Value::Null,
            Value::Integer(_) => value,
            Value::Float(_) => {
                any_float = true;
                value
            }
            Value::Boolean(b) => Value::Integer(i64::from(b)),
            Value::Text(ref s) if s.trim().is_empty() => Value::Null,
            Value::Text(ref s) => match parse_number(s) {
                Some(Parsed::Int(i)) => Value::Integer(i),
                Some(Parsed::Float(f)) => {
                    any_float = true;
                    Value::Float(f)
                }
                None => return Err(ExplorerError::coercion(column, s.as_str(), "number")),
            },
            other => {
                return Err(ExplorerError::coercion(
                    column,
                    format!("{other} ({})", other.type_name()),
                    "number",
                ));
            }
        };
        coerced.push(number);
    }

    if any_float {
        for value in &mut coerced {
            if let Value::Integer(i) = *value {
                *value = Value::Float(i as f64);
            }
        }
    }
    Ok(coerced)
}
