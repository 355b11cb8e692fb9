//! Seed stability curves
//!
//! Expanding means of a metric within each group, ordered by run index, to
//! show whether an estimate settles as more seeds accumulate.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Result, StatsError};
use crate::model::FieldValue;
use crate::stats;
use crate::table::RecordTable;

/// Default ordering field
pub const DEFAULT_ORDER_FIELD: &str = "seed";

/// Ascending with nulls last
fn order_nulls_last(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Cumulative mean of `metric` per level of `group_field`, ordered by
/// `order_field`.
///
/// Records are stably sorted by `order_field` (nulls last) before null metric
/// values are dropped, so element `k` of a curve is the mean of the group's
/// first `k + 1` valid observations. Levels without observations are omitted.
pub fn seed_stability_curves(
    table: &RecordTable,
    group_field: &str,
    metric: &str,
    order_field: &str,
) -> Result<BTreeMap<FieldValue, Vec<f64>>> {
    table.require_group_fields(&[group_field])?;
    if !table.has_field(order_field) {
        return Err(StatsError::UnknownOrderField(order_field.to_string()));
    }
    if !table.resolve_metric(metric) {
        return Ok(BTreeMap::new());
    }

    let records = table.records();
    let mut ordered: Vec<usize> = (0..records.len()).collect();
    ordered.sort_by(|&a, &b| order_nulls_last(records[a].get(order_field), records[b].get(order_field)));

    let mut curves = BTreeMap::new();
    for (key, indices) in table.group_indices_of(ordered, &[group_field]) {
        let values = table.numbers_at(&indices, metric);
        if values.is_empty() {
            continue;
        }
        curves.insert(key.first().clone(), stats::expanding_mean(&values));
    }

    tracing::debug!(groups = curves.len(), "built stability curves");
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedRecord;

    fn record(group: f64, seed: Option<f64>, score: Option<f64>) -> NormalizedRecord {
        NormalizedRecord::new()
            .with("altruism_prob", group)
            .with("seed", seed)
            .with("total_score", score)
    }

    #[test]
    fn test_curves_follow_seed_order() {
        let table = RecordTable::from_records(vec![
            record(0.2, Some(3.0), Some(9.0)),
            record(0.2, Some(1.0), Some(2.0)),
            record(0.2, Some(2.0), Some(4.0)),
            record(0.5, Some(1.0), Some(1.0)),
        ]);
        let curves = seed_stability_curves(&table, "altruism_prob", "total_score", "seed").unwrap();

        assert_eq!(curves[&FieldValue::from(0.2)], vec![2.0, 3.0, 5.0]);
        assert_eq!(curves[&FieldValue::from(0.5)], vec![1.0]);
    }

    #[test]
    fn test_null_metrics_dropped_and_null_seeds_last() {
        let table = RecordTable::from_records(vec![
            record(0.2, None, Some(10.0)),
            record(0.2, Some(2.0), None),
            record(0.2, Some(1.0), Some(4.0)),
            record(0.7, Some(1.0), None),
        ]);
        let curves = seed_stability_curves(&table, "altruism_prob", "total_score", "seed").unwrap();

        assert_eq!(curves.len(), 1);
        assert_eq!(curves[&FieldValue::from(0.2)], vec![4.0, 7.0]);
    }

    #[test]
    fn test_unknown_order_field() {
        let table = RecordTable::from_records(vec![record(0.2, Some(1.0), Some(1.0))]);
        assert_eq!(
            seed_stability_curves(&table, "altruism_prob", "total_score", "run"),
            Err(StatsError::UnknownOrderField("run".into()))
        );
    }
}
