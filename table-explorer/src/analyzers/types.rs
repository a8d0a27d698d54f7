//! Result types produced by the profilers.

use serde::Serialize;

use crate::types::Value;

/// One entry of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentValue {
    pub value: Value,
    /// Number of rows holding the value
    pub occurrence: u64,
    /// `occurrence` over the non-missing row count, rounded to 4 decimals
    pub percentage: f64,
}

/// The most frequent distinct values of a column, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub entries: Vec<FrequentValue>,
}

impl FrequencyTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the `percentage` column.
    pub fn total_fraction(&self) -> f64 {
        self.entries.iter().map(|e| e.percentage).sum()
    }
}

/// A bucket in a numeric histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    /// Lower bound of the bucket (inclusive).
    pub lower_bound: f64,

    /// Upper bound of the bucket (exclusive, inclusive for the last bucket).
    pub upper_bound: f64,

    /// Count of values in this bucket.
    pub count: u64,
}

/// Equal-width binning of a numeric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub buckets: Vec<HistogramBucket>,
    /// Width shared by every bucket
    pub step: f64,
}

impl Histogram {
    /// Total number of values counted across all buckets.
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// One bar of a categorical or time-bucketed chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub key: Value,
    pub count: u64,
}

/// Value counts ready for a bar chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarChart {
    pub bars: Vec<Bar>,
}

impl BarChart {
    pub fn total_count(&self) -> u64 {
        self.bars.iter().map(|b| b.count).sum()
    }
}

/// A labelled, display-ready statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub description: String,
    pub value: String,
}

/// Ordered key-value pairs describing a table or column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub entries: Vec<SummaryEntry>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, description: impl Into<String>, value: impl Into<String>) {
        self.entries.push(SummaryEntry {
            description: description.into(),
            value: value.into(),
        });
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, description: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(description, value);
        self
    }

    /// Looks up an entry by its label.
    pub fn get(&self, description: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.description == description)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, value)` pairs in order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.description.as_str(), e.value.as_str()))
            .collect()
    }
}
