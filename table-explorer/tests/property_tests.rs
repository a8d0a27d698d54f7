//! Property-based tests for the client-side statistics.
//!
//! These check invariants that must hold for any loaded data:
//! - duplicate and missing counts agree with naive reference counts
//! - frequency tables never claim more than every row
//! - histograms count every finite value exactly once
//! - numeric coercion keeps NULL positions and row counts

use proptest::prelude::*;
use table_explorer::analyzers::numeric::coerce_numeric;
use table_explorer::analyzers::stats;
use table_explorer::table_profile::{duplicate_rows, missing_cells};
use table_explorer::types::{Row, Value};

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::Float(f64::NAN)),
        (-5i64..5).prop_map(Value::Integer),
        "[a-c]{0,2}".prop_map(Value::Text),
    ]
}

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    (1usize..4).prop_flat_map(|width| {
        prop::collection::vec(prop::collection::vec(value_strategy(), width), 0..30)
    })
}

proptest! {
    #[test]
    fn duplicates_match_pairwise_scan(rows in rows_strategy()) {
        let expected = (0..rows.len())
            .filter(|&i| rows[..i].iter().any(|earlier| *earlier == rows[i]))
            .count() as u64;
        prop_assert_eq!(duplicate_rows(&rows), expected);
    }

    #[test]
    fn distinct_rows_have_no_duplicates(ids in prop::collection::hash_set(any::<i64>(), 0..50)) {
        let rows: Vec<Row> = ids.into_iter().map(|id| vec![Value::Integer(id), Value::Null]).collect();
        prop_assert_eq!(duplicate_rows(&rows), 0);
    }

    #[test]
    fn missing_cells_count_nulls_and_nans(rows in rows_strategy()) {
        let expected = rows
            .iter()
            .flatten()
            .filter(|v| matches!(v, Value::Null) || matches!(v, Value::Float(f) if f.is_nan()))
            .count() as u64;
        prop_assert_eq!(missing_cells(&rows), expected);
    }

    #[test]
    fn frequency_fractions_sum_to_at_most_one(
        values in prop::collection::vec(value_strategy(), 0..60),
        top_n in 1usize..30,
    ) {
        let table = stats::frequency_table(&values, top_n);
        prop_assert!(table.len() <= top_n);
        // each entry is rounded to 4 decimals
        prop_assert!(table.total_fraction() <= 1.0 + 0.00005 * table.len() as f64);
        for pair in table.entries.windows(2) {
            prop_assert!(pair[0].occurrence >= pair[1].occurrence);
        }
    }

    #[test]
    fn histogram_counts_every_finite_value(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
        max_bins in 1usize..100,
    ) {
        let histogram = stats::histogram(&values, max_bins);
        prop_assert_eq!(histogram.total_count(), values.len() as u64);
        prop_assert!(!histogram.buckets.is_empty());
        let first = &histogram.buckets[0];
        let last = &histogram.buckets[histogram.buckets.len() - 1];
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(first.lower_bound <= lo);
        prop_assert!(last.upper_bound >= hi - histogram.step * 1e-9);
    }

    #[test]
    fn coercion_keeps_nulls_in_place(values in prop::collection::vec(prop::option::of(-1000i64..1000), 0..40)) {
        let loaded: Vec<Value> = values
            .iter()
            .map(|v| v.map_or(Value::Null, |i| Value::Text(i.to_string())))
            .collect();
        let coerced = coerce_numeric("amount", loaded).unwrap();
        prop_assert_eq!(coerced.len(), values.len());
        for (original, value) in values.iter().zip(&coerced) {
            match original {
                Some(i) => prop_assert_eq!(value, &Value::Integer(*i)),
                None => prop_assert!(value.is_null()),
            }
        }
    }
}
