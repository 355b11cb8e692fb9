//! Typed simulation result records
//!
//! One [`SimulationResult`] is one Monte Carlo run: the sweep configuration
//! it ran with plus its measured outcomes. Every field is optional because
//! result files from different experiment versions carry different subsets.
//! Unknown fields are kept in `extra` so they stay reachable by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::source::FieldSource;
use super::value::FieldValue;

/// Sweep parameters a run was executed with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub altruism_prob: Option<f64>,
    pub tau_margin: Option<f64>,
    pub epsilon_fresh: Option<f64>,
    pub epsilon_mono: Option<f64>,
    pub subjects: Option<f64>,
    pub memory_size: Option<f64>,
    /// Configured conversation length (turn budget)
    pub conversation_length: Option<f64>,
    pub seed: Option<f64>,
    pub min_samples_pid: Option<f64>,
    pub ewma_alpha: Option<f64>,
    pub importance_weight: Option<f64>,
    pub coherence_weight: Option<f64>,
    pub freshness_weight: Option<f64>,
    pub monotony_weight: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Per-player outcome summary within a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub class_name: Option<String>,
    pub alias: Option<String>,
    pub total: Option<f64>,
    pub shared: Option<f64>,
    pub individual: Option<f64>,
    pub rank: Option<f64>,
}

/// Shared score split into named components (`total` is reserved)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown(pub BTreeMap<String, f64>);

/// Per-player metrics keyed by player label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerMetricsMap(pub BTreeMap<String, PlayerMetrics>);

/// Outcome of a single simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    pub config: Option<RunConfig>,
    pub total_score: Option<f64>,
    pub player10_total_mean: Option<f64>,
    pub player10_individual_mean: Option<f64>,
    pub player10_rank_mean: Option<f64>,
    pub player10_gap_to_best: Option<f64>,
    pub player10_instances: Option<f64>,
    pub best_total_score: Option<f64>,
    /// Realized conversation length
    pub conversation_length: Option<f64>,
    /// Boolean or numeric flag depending on the producer; `Some(Null)` when
    /// written as an explicit null
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub early_termination: Option<FieldValue>,
    pub pause_count: Option<f64>,
    pub unique_items_used: Option<f64>,
    pub execution_time: Option<f64>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub player_metrics: Option<PlayerMetricsMap>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Keep a present field as `Some`, including an explicit null
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<FieldValue>, D::Error> {
    FieldValue::deserialize(deserializer).map(Some)
}

fn extra_scalar(extra: &BTreeMap<String, serde_json::Value>, field: &str) -> Option<FieldValue> {
    match extra.get(field)? {
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        value => Some(FieldValue::from_json(value)),
    }
}

fn with_extra(mut names: Vec<String>, extra: &BTreeMap<String, serde_json::Value>) -> Vec<String> {
    names.extend(extra.keys().cloned());
    names
}

impl FieldSource for RunConfig {
    fn scalar(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "altruism_prob" => self.altruism_prob,
            "tau_margin" => self.tau_margin,
            "epsilon_fresh" => self.epsilon_fresh,
            "epsilon_mono" => self.epsilon_mono,
            "subjects" => self.subjects,
            "memory_size" => self.memory_size,
            "conversation_length" => self.conversation_length,
            "seed" => self.seed,
            "min_samples_pid" => self.min_samples_pid,
            "ewma_alpha" => self.ewma_alpha,
            "importance_weight" => self.importance_weight,
            "coherence_weight" => self.coherence_weight,
            "freshness_weight" => self.freshness_weight,
            "monotony_weight" => self.monotony_weight,
            _ => return extra_scalar(&self.extra, field),
        };
        value.map(FieldValue::from)
    }

    fn nested(&self, field: &str) -> Option<&dyn FieldSource> {
        self.extra
            .get(field)
            .filter(|value| value.is_object())
            .map(|value| value as &dyn FieldSource)
    }

    fn field_names(&self) -> Vec<String> {
        let known = [
            ("altruism_prob", self.altruism_prob),
            ("tau_margin", self.tau_margin),
            ("epsilon_fresh", self.epsilon_fresh),
            ("epsilon_mono", self.epsilon_mono),
            ("subjects", self.subjects),
            ("memory_size", self.memory_size),
            ("conversation_length", self.conversation_length),
            ("seed", self.seed),
            ("min_samples_pid", self.min_samples_pid),
            ("ewma_alpha", self.ewma_alpha),
            ("importance_weight", self.importance_weight),
            ("coherence_weight", self.coherence_weight),
            ("freshness_weight", self.freshness_weight),
            ("monotony_weight", self.monotony_weight),
        ];
        let names = known
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(name, _)| (*name).to_string())
            .collect();
        with_extra(names, &self.extra)
    }
}

impl FieldSource for PlayerMetrics {
    fn scalar(&self, field: &str) -> Option<FieldValue> {
        match field {
            "class_name" => self.class_name.as_deref().map(FieldValue::from),
            "alias" => self.alias.as_deref().map(FieldValue::from),
            "total" => self.total.map(FieldValue::from),
            "shared" => self.shared.map(FieldValue::from),
            "individual" => self.individual.map(FieldValue::from),
            "rank" => self.rank.map(FieldValue::from),
            _ => None,
        }
    }

    fn nested(&self, _field: &str) -> Option<&dyn FieldSource> {
        None
    }

    fn field_names(&self) -> Vec<String> {
        ["class_name", "alias", "total", "shared", "individual", "rank"]
            .into_iter()
            .filter(|name| self.scalar(name).is_some())
            .map(str::to_string)
            .collect()
    }
}

impl FieldSource for ScoreBreakdown {
    fn scalar(&self, field: &str) -> Option<FieldValue> {
        self.0.get(field).copied().map(FieldValue::from)
    }

    fn nested(&self, _field: &str) -> Option<&dyn FieldSource> {
        None
    }

    fn field_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl FieldSource for PlayerMetricsMap {
    fn scalar(&self, _field: &str) -> Option<FieldValue> {
        None
    }

    fn nested(&self, field: &str) -> Option<&dyn FieldSource> {
        self.0.get(field).map(|metrics| metrics as &dyn FieldSource)
    }

    fn field_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl FieldSource for SimulationResult {
    fn scalar(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "total_score" => self.total_score,
            "player10_total_mean" => self.player10_total_mean,
            "player10_individual_mean" => self.player10_individual_mean,
            "player10_rank_mean" => self.player10_rank_mean,
            "player10_gap_to_best" => self.player10_gap_to_best,
            "player10_instances" => self.player10_instances,
            "best_total_score" => self.best_total_score,
            "conversation_length" => self.conversation_length,
            "pause_count" => self.pause_count,
            "unique_items_used" => self.unique_items_used,
            "execution_time" => self.execution_time,
            "early_termination" => return self.early_termination.clone(),
            "config" | "score_breakdown" | "player_metrics" => return None,
            _ => return extra_scalar(&self.extra, field),
        };
        value.map(FieldValue::from)
    }

    fn nested(&self, field: &str) -> Option<&dyn FieldSource> {
        match field {
            "config" => self.config.as_ref().map(|c| c as &dyn FieldSource),
            "score_breakdown" => self.score_breakdown.as_ref().map(|b| b as &dyn FieldSource),
            "player_metrics" => self.player_metrics.as_ref().map(|m| m as &dyn FieldSource),
            _ => self
                .extra
                .get(field)
                .filter(|value| value.is_object())
                .map(|value| value as &dyn FieldSource),
        }
    }

    fn field_names(&self) -> Vec<String> {
        let known = [
            "total_score",
            "player10_total_mean",
            "player10_individual_mean",
            "player10_rank_mean",
            "player10_gap_to_best",
            "player10_instances",
            "best_total_score",
            "conversation_length",
            "early_termination",
            "pause_count",
            "unique_items_used",
            "execution_time",
        ];
        let names = known
            .into_iter()
            .filter(|name| self.scalar(name).is_some())
            .map(str::to_string)
            .collect();
        with_extra(names, &self.extra)
    }
}
