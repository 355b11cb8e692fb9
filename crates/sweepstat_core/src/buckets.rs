//! Per-altruism chart series
//!
//! Raw score distributions and mean score-breakdown components for every
//! altruism level.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::FieldValue;
use crate::normalize::BREAKDOWN_PREFIX;
use crate::stats::MeanAccumulator;
use crate::table::RecordTable;

const ALTRUISM_FIELD: &str = "altruism_prob";

/// Breakdown components charted by default
pub const DEFAULT_COMPONENTS: [&str; 4] = ["importance", "coherence", "freshness", "nonmonotonousness"];

/// Raw observations for one altruism level
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBucket {
    /// Collective scores
    pub total: Vec<f64>,
    /// Tracked player's total scores
    pub player10: Vec<f64>,
}

/// Collect `total_score` and `player10_score` observations per altruism level.
///
/// Records without an altruism value are skipped; missing scores are left
/// out of their list.
pub fn score_buckets_by_altruism(table: &RecordTable) -> BTreeMap<FieldValue, ScoreBucket> {
    let mut buckets: BTreeMap<FieldValue, ScoreBucket> = BTreeMap::new();
    if !table.resolve_metric(ALTRUISM_FIELD) {
        return buckets;
    }
    for record in table.records() {
        let level = record.get(ALTRUISM_FIELD);
        if level.is_null() {
            continue;
        }
        let bucket = buckets.entry(level.clone()).or_default();
        if let Some(total) = record.number("total_score") {
            bucket.total.push(total);
        }
        if let Some(player) = record.number("player10_score") {
            bucket.player10.push(player);
        }
    }
    buckets
}

/// Mean breakdown components aligned with `levels`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMeans {
    /// Altruism levels with at least one component observation, ascending
    pub levels: Vec<FieldValue>,
    /// Component name to per-level mean, `None` where the level has no
    /// observation of that component
    pub series: BTreeMap<String, Vec<Option<f64>>>,
}

/// Average each breakdown component (read from its `shared_` field) per
/// altruism level.
///
/// Returns `None` when no record carries any of the components.
pub fn component_means_by_altruism<S: AsRef<str>>(
    table: &RecordTable,
    components: &[S],
) -> Option<ComponentMeans> {
    if !table.has_field(ALTRUISM_FIELD) {
        return None;
    }
    let fields: Vec<String> = components
        .iter()
        .map(|c| format!("{BREAKDOWN_PREFIX}{}", c.as_ref()))
        .collect();

    let mut sums: BTreeMap<FieldValue, Vec<MeanAccumulator>> = BTreeMap::new();
    for record in table.records() {
        let level = record.get(ALTRUISM_FIELD);
        if level.is_null() {
            continue;
        }
        for (slot, field) in fields.iter().enumerate() {
            if let Some(value) = record.number(field) {
                sums.entry(level.clone())
                    .or_insert_with(|| vec![MeanAccumulator::default(); fields.len()])[slot]
                    .add(value);
            }
        }
    }
    if sums.is_empty() {
        return None;
    }

    let series = components
        .iter()
        .enumerate()
        .map(|(slot, component)| {
            let means = sums.values().map(|accs| accs[slot].mean()).collect();
            (component.as_ref().to_string(), means)
        })
        .collect();
    Some(ComponentMeans {
        levels: sums.into_keys().collect(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedRecord;

    #[test]
    fn test_score_buckets() {
        let table = RecordTable::from_records(vec![
            NormalizedRecord::new()
                .with("altruism_prob", 0.5)
                .with("total_score", 10.0)
                .with("player10_score", 2.0),
            NormalizedRecord::new()
                .with("altruism_prob", 0.2)
                .with("total_score", 7.0)
                .with("player10_score", None::<f64>),
            NormalizedRecord::new()
                .with("altruism_prob", None::<f64>)
                .with("total_score", 99.0),
            NormalizedRecord::new()
                .with("altruism_prob", 0.5)
                .with("total_score", 12.0)
                .with("player10_score", 3.0),
        ]);
        let buckets = score_buckets_by_altruism(&table);

        let levels: Vec<_> = buckets.keys().cloned().collect();
        assert_eq!(levels, vec![FieldValue::from(0.2), FieldValue::from(0.5)]);
        assert_eq!(buckets[&FieldValue::from(0.2)].player10, Vec::<f64>::new());
        assert_eq!(buckets[&FieldValue::from(0.5)].total, vec![10.0, 12.0]);
        assert_eq!(buckets[&FieldValue::from(0.5)].player10, vec![2.0, 3.0]);
    }

    #[test]
    fn test_component_means() {
        let table = RecordTable::from_records(vec![
            NormalizedRecord::new()
                .with("altruism_prob", 0.2)
                .with("shared_importance", 4.0)
                .with("shared_coherence", 1.0),
            NormalizedRecord::new()
                .with("altruism_prob", 0.2)
                .with("shared_importance", 6.0),
            NormalizedRecord::new()
                .with("altruism_prob", 0.8)
                .with("shared_coherence", 3.0),
            NormalizedRecord::new().with("altruism_prob", 0.9),
        ]);
        let means = component_means_by_altruism(&table, &DEFAULT_COMPONENTS).unwrap();

        assert_eq!(means.levels, vec![FieldValue::from(0.2), FieldValue::from(0.8)]);
        assert_eq!(means.series["importance"], vec![Some(5.0), None]);
        assert_eq!(means.series["coherence"], vec![Some(1.0), Some(3.0)]);
        assert_eq!(means.series["freshness"], vec![None, None]);
    }

    #[test]
    fn test_component_means_without_breakdowns() {
        let table = RecordTable::from_records(vec![NormalizedRecord::new().with("altruism_prob", 0.2)]);
        assert!(component_means_by_altruism(&table, &DEFAULT_COMPONENTS).is_none());
    }
}
