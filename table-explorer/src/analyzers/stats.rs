//! Client-side statistics over loaded column values.
//!
//! Missing values (NULL and NaN) are ignored by every function here.

use std::collections::HashMap;

use super::types::{Bar, BarChart, FrequencyTable, FrequentValue, Histogram, HistogramBucket};
use crate::types::Value;

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn missing_count(values: &[Value]) -> u64 {
    values.iter().filter(|v| v.is_missing()).count() as u64
}

/// Number of distinct non-missing values.
pub fn distinct_count(values: &[Value]) -> u64 {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_missing())
        .filter(|v| seen.insert(*v))
        .count() as u64
}

/// Non-missing numeric values as `f64`.
pub fn numbers(values: &[Value]) -> Vec<f64> {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .filter_map(Value::as_f64)
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Middle value; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Occurrence counts of every distinct non-missing value, most frequent
/// first. Ties keep the order in which values first appear.
pub fn value_counts(values: &[Value]) -> Vec<(Value, u64)> {
    let mut counts: HashMap<&Value, (u64, usize)> = HashMap::new();
    for (idx, value) in values.iter().enumerate() {
        if value.is_missing() {
            continue;
        }
        counts.entry(value).or_insert((0, idx)).0 += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|(_, (ca, ia)), (_, (cb, ib))| cb.cmp(ca).then(ia.cmp(ib)));
    counts
        .into_iter()
        .map(|(value, (count, _))| (value.clone(), count))
        .collect()
}

/// The `top_n` most frequent values with their share of non-missing rows.
pub fn frequency_table(values: &[Value], top_n: usize) -> FrequencyTable {
    let present = values.len() as u64 - missing_count(values);
    let entries = value_counts(values)
        .into_iter()
        .take(top_n)
        .map(|(value, occurrence)| FrequentValue {
            value,
            occurrence,
            percentage: round_to(occurrence as f64 / present as f64, 4),
        })
        .collect();
    FrequencyTable { entries }
}

/// Bar chart of every distinct value, most frequent first.
pub fn categorical_bars(values: &[Value]) -> BarChart {
    BarChart {
        bars: value_counts(values)
            .into_iter()
            .map(|(key, count)| Bar { key, count })
            .collect(),
    }
}

/// Bin boundaries chosen the way Vega-Lite picks "nice" bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSpec {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl BinSpec {
    /// Step is a power of ten times 1, 2 or 5, giving at most `max_bins` bins
    /// over `[min, max]`; start and stop are snapped to multiples of the step.
    ///
    /// A single distinct value gets the one bin `[value, value + 1)`.
    pub fn nice(min: f64, max: f64, max_bins: usize) -> Self {
        const BASE: f64 = 10.0;
        if min == max {
            return Self {
                start: min,
                stop: min + 1.0,
                step: 1.0,
            };
        }
        let max_bins = max_bins.max(1) as f64;
        let span = max - min;
        let level = (max_bins.ln() / BASE.ln()).ceil();
        let mut step = BASE.powf((span.ln() / BASE.ln()).round() - level);

        while (span / step).ceil() > max_bins {
            step *= BASE;
        }
        for div in [5.0, 2.0] {
            let candidate = step / div;
            if span / candidate <= max_bins {
                step = candidate;
            }
        }

        let log_step = step.ln();
        let precision = if log_step >= 0.0 {
            0.0
        } else {
            (-log_step / BASE.ln()).trunc() + 1.0
        };
        let eps = BASE.powf(-precision - 1.0);

        let floor = (min / step + eps).floor() * step;
        let start = if min < floor { floor - step } else { floor };
        let stop = (max / step).ceil() * step;
        let stop = if stop == start { start + step } else { stop };

        Self { start, stop, step }
    }

    pub fn bin_count(&self) -> usize {
        (((self.stop - self.start) / self.step).round() as usize).max(1)
    }
}

/// Counts finite values into nice equal-width bins. Empty bins are kept so
/// the buckets tile `[start, stop]`.
pub fn histogram(values: &[f64], max_bins: usize) -> Histogram {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (Some(lo), Some(hi)) = (min(&finite), max(&finite)) else {
        return Histogram::default();
    };

    let spec = BinSpec::nice(lo, hi, max_bins);
    let bins = spec.bin_count();
    let mut counts = vec![0u64; bins];
    for v in finite {
        let idx = ((v - spec.start) / spec.step).floor();
        let idx = if idx < 0.0 { 0 } else { (idx as usize).min(bins - 1) };
        counts[idx] += 1;
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBucket {
            lower_bound: spec.start + i as f64 * spec.step,
            upper_bound: spec.start + (i + 1) as f64 * spec.step,
            count,
        })
        .collect();
    Histogram {
        buckets,
        step: spec.step,
    }
}
