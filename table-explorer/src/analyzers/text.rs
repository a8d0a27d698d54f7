//! Text column profiler.
//!
//! The mode and the character-class counts come from the database; the class
//! counts use anchored POSIX bracket expressions (`~ '^[[:alpha:]]*$'`), so a
//! value counts only when every character belongs to the class.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use super::stats;
use super::types::{BarChart, FrequencyTable, Summary};
use super::{
    computed, db_count, ensure_loaded, fetch_column, loaded_state, ColumnFamily, ColumnProfiler,
    ColumnRef, ProfileState,
};
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::formatters::format_count;
use crate::log_stats;
use crate::queries::{self, CharClass};
use crate::sources::Session;
use crate::types::Value;

/// Statistics of a text column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStats {
    pub unique_count: u64,
    pub missing_count: u64,
    /// Same as `missing_count`: empty values are the missing ones
    pub empty_count: u64,
    /// Most frequent value as reported by the database
    pub mode: Option<String>,
    pub whitespace_count: u64,
    pub lowercase_count: u64,
    pub uppercase_count: u64,
    pub alphabetic_count: u64,
    pub digit_count: u64,
    /// Count of every distinct value
    pub bars: BarChart,
    pub frequent: FrequencyTable,
}

/// Profiler for a column of the text family.
#[derive(Debug, Clone)]
pub struct TextColumn {
    column: ColumnRef,
    state: ProfileState,
    values: Vec<Value>,
    stats: Option<TextStats>,
}

impl TextColumn {
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

    pub fn stats(&self) -> Result<&TextStats> {
        computed(&self.column, self.state, self.stats.as_ref())
    }

    pub fn bar_chart(&self) -> Result<&BarChart> {
        Ok(&self.stats()?.bars)
    }
}

#[async_trait]
impl ColumnProfiler for TextColumn {
    fn column(&self) -> &ColumnRef {
        &self.column
    }

    fn family(&self) -> ColumnFamily {
        ColumnFamily::Text
    }

    fn state(&self) -> ProfileState {
        self.state
    }

    #[instrument(skip(self, session), fields(column = %self.column))]
    async fn load(&mut self, session: &mut Session) -> Result<ProfileState> {
        self.values = fetch_column(session, &self.column).await?;
        self.state = loaded_state(&self.values);
        self.stats = None;
        info!(rows = self.values.len(), state = %self.state, "Loaded text column");
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

        let unique_count = stats::distinct_count(&self.values);
        let missing_count = stats::missing_count(&self.values);
        let empty_count = missing_count;
        let mode = match session
            .run("mode", queries::mode_query(schema, table, col))
            .await?
            .scalar()?
        {
            Value::Null => None,
            v => Some(v.to_string()),
        };

        let mut class_counts = [0u64; 5];
        for (slot, class) in class_counts.iter_mut().zip(CharClass::ALL) {
            *slot = db_count(
                session,
                class.posix_name(),
                queries::char_class_query(class, schema, table, col),
            )
            .await?;
        }
        let [whitespace_count, lowercase_count, uppercase_count, alphabetic_count, digit_count] =
            class_counts;

        let bars = stats::categorical_bars(&self.values);
        let frequent = stats::frequency_table(&self.values, config.top_n);

        log_stats!(
            config.log,
            column = %self.column,
            unique_count,
            missing_count,
            mode = ?mode,
            "Computed text statistics"
        );
        self.stats = Some(TextStats {
            unique_count,
            missing_count,
            empty_count,
            mode,
            whitespace_count,
            lowercase_count,
            uppercase_count,
            alphabetic_count,
            digit_count,
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
            .with("Number of Empty values", format_count(s.empty_count))
            .with("Number of Whitespaces", format_count(s.whitespace_count))
            .with("Mode of Values", s.mode.clone().unwrap_or_else(|| "None".to_string()))
            .with("Number of lowercase", format_count(s.lowercase_count))
            .with("Number of uppercase", format_count(s.uppercase_count))
            .with(
                "Number of Series with alphabetical characters",
                format_count(s.alphabetic_count),
            )
            .with(
                "Number of Series with digit characters",
                format_count(s.digit_count),
            ))
    }

    fn frequent(&self) -> Result<&FrequencyTable> {
        Ok(&self.stats()?.frequent)
    }
}
