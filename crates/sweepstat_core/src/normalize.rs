//! Record normalization
//!
//! Flattens heterogeneous simulation results into [`NormalizedRecord`]s:
//! open, name-keyed mappings of scalar fields with a stable schema. Sweep
//! knobs are read from the nested `config` record, outcomes from the result
//! itself, and score-breakdown components are copied under a `shared_`
//! prefix. Extraction never fails; anything unresolvable becomes `Null`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{FieldSource, FieldValue, NULL, get, scalar_entries};

/// Prefix applied to score-breakdown component fields
pub const BREAKDOWN_PREFIX: &str = "shared_";

/// Reserved breakdown key that is not copied
pub const BREAKDOWN_TOTAL_KEY: &str = "total";

/// Derived ratio of realized to configured conversation length
pub const LENGTH_UTILIZATION: &str = "length_utilization";

/// Where a canonical field is read from
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// Field of the nested configuration record
    Config(&'static str),
    /// Outcome field on the result, `Null` when absent
    Outcome(&'static str),
    /// Outcome field on the result with a fallback when absent
    OutcomeOr(&'static str, f64),
}

/// Canonical output fields in schema order
const CANONICAL_FIELDS: &[(&str, Origin)] = &[
    ("altruism_prob", Origin::Config("altruism_prob")),
    ("tau_margin", Origin::Config("tau_margin")),
    ("epsilon_fresh", Origin::Config("epsilon_fresh")),
    ("epsilon_mono", Origin::Config("epsilon_mono")),
    ("subjects", Origin::Config("subjects")),
    ("memory_size", Origin::Config("memory_size")),
    ("conversation_length_cfg", Origin::Config("conversation_length")),
    ("seed", Origin::Config("seed")),
    ("min_samples_pid", Origin::Config("min_samples_pid")),
    ("ewma_alpha", Origin::Config("ewma_alpha")),
    ("importance_weight", Origin::Config("importance_weight")),
    ("coherence_weight", Origin::Config("coherence_weight")),
    ("freshness_weight", Origin::Config("freshness_weight")),
    ("monotony_weight", Origin::Config("monotony_weight")),
    ("total_score", Origin::Outcome("total_score")),
    ("player10_score", Origin::Outcome("player10_total_mean")),
    ("player10_individual", Origin::Outcome("player10_individual_mean")),
    ("player10_rank", Origin::Outcome("player10_rank_mean")),
    ("player10_gap_to_best", Origin::Outcome("player10_gap_to_best")),
    ("player10_instances", Origin::Outcome("player10_instances")),
    ("best_total_score", Origin::Outcome("best_total_score")),
    ("conversation_length", Origin::Outcome("conversation_length")),
    ("early_termination", Origin::OutcomeOr("early_termination", 0.0)),
    ("pause_count", Origin::Outcome("pause_count")),
    ("unique_items_used", Origin::Outcome("unique_items_used")),
    ("execution_time", Origin::Outcome("execution_time")),
];

/// Names of the fixed fields every normalized record carries, in schema order
pub fn canonical_field_names() -> impl Iterator<Item = &'static str> {
    CANONICAL_FIELDS
        .iter()
        .map(|(name, _)| *name)
        .chain(std::iter::once(LENGTH_UTILIZATION))
}

/// Schema position of a field: canonical fields first, everything else after
pub(crate) fn schema_rank(field: &str) -> usize {
    canonical_field_names()
        .position(|name| name == field)
        .unwrap_or(usize::MAX)
}

/// Flat mapping from field name to scalar value
///
/// Fields whose value came from a normalizer fallback rather than the result
/// are remembered, so views that report coverage can tell them apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, FieldValue>,
    #[serde(skip)]
    defaulted: BTreeSet<String>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, `Null` when the record does not carry it
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Numeric value of `field`, `None` for null or text
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).as_f64()
    }

    /// Numeric value of `field` as the result reported it; `None` when the
    /// value is a fallback filled in by the normalizer
    pub fn observed_number(&self, field: &str) -> Option<f64> {
        if self.is_defaulted(field) {
            return None;
        }
        self.number(field)
    }

    /// Whether `field` holds a fallback rather than a reported value
    pub fn is_defaulted(&self, field: &str) -> bool {
        self.defaulted.contains(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        self.defaulted.remove(&field);
        self.fields.insert(field, value.into());
    }

    fn insert_default(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
        self.defaulted.insert(field.to_string());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(field)
    }

    pub(crate) fn fill_missing(&mut self, field: &str) {
        if !self.fields.contains_key(field) {
            self.fields.insert(field.to_string(), FieldValue::Null);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for NormalizedRecord {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            defaulted: BTreeSet::new(),
        }
    }
}

/// Flatten a single result.
pub fn normalize_result(result: &dyn FieldSource) -> NormalizedRecord {
    let config = result.nested("config");
    let mut record = NormalizedRecord::new();

    for (name, origin) in CANONICAL_FIELDS {
        match *origin {
            Origin::Config(field) => record.insert(*name, get(config, field, FieldValue::Null)),
            Origin::Outcome(field) => record.insert(*name, get(Some(result), field, FieldValue::Null)),
            Origin::OutcomeOr(field, fallback) => match result.scalar(field) {
                Some(value) => record.insert(*name, value),
                None => record.insert_default(name, FieldValue::Number(fallback)),
            },
        }
    }

    if let Some(breakdown) = result.nested("score_breakdown") {
        for (component, value) in scalar_entries(breakdown) {
            if component == BREAKDOWN_TOTAL_KEY {
                continue;
            }
            record.insert(format!("{BREAKDOWN_PREFIX}{component}"), value);
        }
    }

    let utilization = match (
        record.number("conversation_length_cfg"),
        record.number("conversation_length"),
    ) {
        (Some(configured), Some(realized)) if configured != 0.0 => {
            FieldValue::Number(realized / configured)
        }
        _ => FieldValue::Null,
    };
    record.insert(LENGTH_UTILIZATION, utilization);

    record
}

/// Flatten a batch of results, preserving order.
pub fn results_to_records<S: FieldSource>(results: &[S]) -> Vec<NormalizedRecord> {
    results
        .iter()
        .map(|result| normalize_result(result))
        .collect()
}

/// Sweep keys copied onto every long-form player row
const PLAYER_ROW_KEYS: &[&str] = &["altruism_prob", "tau_margin", "epsilon_fresh", "epsilon_mono", "seed"];

/// Per-player fields copied onto every long-form player row
const PLAYER_ROW_FIELDS: &[&str] = &["class_name", "alias", "total", "shared", "individual", "rank"];

/// Explode each result's `player_metrics` mapping into one record per player.
///
/// Rows carry the run's sweep keys and seed, the player `label`, and the
/// per-player outcome fields. Results without player metrics contribute no
/// rows.
pub fn player_metrics_long<S: FieldSource>(results: &[S]) -> Vec<NormalizedRecord> {
    let mut rows = Vec::new();
    for result in results {
        let Some(players) = result.nested("player_metrics") else {
            continue;
        };
        let config = result.nested("config");
        for label in players.field_names() {
            let player = players.nested(&label);
            let mut row: NormalizedRecord = PLAYER_ROW_KEYS
                .iter()
                .map(|key| (*key, get(config, key, FieldValue::Null)))
                .collect();
            row.insert("label", label.as_str());
            for field in PLAYER_ROW_FIELDS {
                row.insert(*field, get(player, field, FieldValue::Null));
            }
            rows.push(row);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimulationResult;
    use serde_json::json;

    #[test]
    fn test_every_canonical_field_present() {
        let record = normalize_result(&json!({}));
        for name in canonical_field_names() {
            assert!(record.contains(name), "missing {name}");
        }
        assert!(record.get("altruism_prob").is_null());
        // Absent early termination defaults to "not terminated"
        assert_eq!(record.get("early_termination"), &FieldValue::from(0.0));
        assert!(record.is_defaulted("early_termination"));
        assert_eq!(record.observed_number("early_termination"), None);
    }

    #[test]
    fn test_reported_early_termination_is_observed() {
        let reported = normalize_result(&json!({"early_termination": true}));
        assert!(!reported.is_defaulted("early_termination"));
        assert_eq!(reported.observed_number("early_termination"), Some(1.0));

        let null = normalize_result(&json!({"early_termination": null}));
        assert!(null.get("early_termination").is_null());
        assert!(!null.is_defaulted("early_termination"));

        let mut overwritten = normalize_result(&json!({}));
        overwritten.insert("early_termination", 0.0);
        assert_eq!(overwritten.observed_number("early_termination"), Some(0.0));
    }

    #[test]
    fn test_config_and_outcome_fields() {
        let result = json!({
            "config": {"altruism_prob": 0.5, "conversation_length": 40, "seed": 3},
            "total_score": 88.0,
            "player10_total_mean": 12.0,
            "conversation_length": 30,
            "early_termination": false
        });
        let record = normalize_result(&result);

        assert_eq!(record.number("altruism_prob"), Some(0.5));
        assert_eq!(record.number("conversation_length_cfg"), Some(40.0));
        assert_eq!(record.number("seed"), Some(3.0));
        assert_eq!(record.number("total_score"), Some(88.0));
        assert_eq!(record.number("player10_score"), Some(12.0));
        assert_eq!(record.number("early_termination"), Some(0.0));
        assert_eq!(record.number(LENGTH_UTILIZATION), Some(0.75));
    }

    #[test]
    fn test_length_utilization_requires_nonzero_config() {
        let zero = normalize_result(&json!({"config": {"conversation_length": 0}, "conversation_length": 10}));
        assert!(zero.get(LENGTH_UTILIZATION).is_null());

        let missing = normalize_result(&json!({"config": {"conversation_length": 10}}));
        assert!(missing.get(LENGTH_UTILIZATION).is_null());

        let realized_zero = normalize_result(&json!({"config": {"conversation_length": 10}, "conversation_length": 0}));
        assert_eq!(realized_zero.number(LENGTH_UTILIZATION), Some(0.0));
    }

    #[test]
    fn test_breakdown_is_prefixed_and_skips_total() {
        let result = json!({
            "score_breakdown": {"total": 10.0, "importance": 4.0, "coherence": 6.0}
        });
        let record = normalize_result(&result);

        assert_eq!(record.number("shared_importance"), Some(4.0));
        assert_eq!(record.number("shared_coherence"), Some(6.0));
        assert!(!record.contains("shared_total"));
    }

    #[test]
    fn test_malformed_config_degrades_to_null() {
        let record = normalize_result(&json!({"config": "oops", "total_score": 1.0}));
        assert!(record.get("altruism_prob").is_null());
        assert_eq!(record.number("total_score"), Some(1.0));
    }

    #[test]
    fn test_results_to_records_preserves_order() {
        let results: Vec<SimulationResult> = (0..5)
            .map(|i| SimulationResult {
                total_score: Some(i as f64),
                ..Default::default()
            })
            .collect();
        let records = results_to_records(&results);
        let scores: Vec<_> = records.iter().map(|r| r.number("total_score")).collect();
        assert_eq!(scores, vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_player_metrics_long() {
        let results = vec![
            json!({
                "config": {"altruism_prob": 0.2, "seed": 1},
                "player_metrics": {
                    "p10": {"class_name": "Player10", "total": 5.0, "rank": 2},
                    "p3": {"class_name": "Player3", "individual": 1.5}
                }
            }),
            json!({"config": {"altruism_prob": 0.4}}),
        ];
        let rows = player_metrics_long(&results);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("label"), &FieldValue::from("p10"));
        assert_eq!(rows[0].get("class_name"), &FieldValue::from("Player10"));
        assert_eq!(rows[0].number("rank"), Some(2.0));
        assert_eq!(rows[0].number("altruism_prob"), Some(0.2));
        assert_eq!(rows[1].get("label"), &FieldValue::from("p3"));
        assert!(rows[1].get("total").is_null());
        assert!(rows[1].get("tau_margin").is_null());
    }
}
