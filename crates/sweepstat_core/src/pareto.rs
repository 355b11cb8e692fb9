//! Collective vs individual trade-off points
//!
//! Aggregates the collective score and the tracked player's individual
//! score per configuration of the four strategy knobs.

use serde::Serialize;

use crate::model::FieldValue;
use crate::stats::MeanAccumulator;
use crate::table::RecordTable;

/// Configuration fields forming the point key, in key order
pub const PARETO_KEY_FIELDS: [&str; 4] = ["altruism_prob", "tau_margin", "epsilon_fresh", "epsilon_mono"];

const COLLECTIVE_METRIC: &str = "total_score";
const INDIVIDUAL_METRIC: &str = "player10_individual";
const EARLY_TERMINATION: &str = "early_termination";

/// One configuration's averaged outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoPoint {
    pub altruism: FieldValue,
    pub tau: FieldValue,
    pub fresh: FieldValue,
    pub mono: FieldValue,
    /// Mean collective score
    pub total: f64,
    /// Mean individual score
    pub individual: f64,
    /// Mean early-termination rate, `None` without observations
    pub early: Option<f64>,
    /// Collective-score observations
    pub runs: usize,
    /// Individual-score observations
    pub individual_runs: usize,
}

impl ParetoPoint {
    /// The four key values in key order
    pub fn key(&self) -> [&FieldValue; 4] {
        [&self.altruism, &self.tau, &self.fresh, &self.mono]
    }
}

#[derive(Default)]
struct PointAccumulator {
    total: MeanAccumulator,
    individual: MeanAccumulator,
    early: MeanAccumulator,
}

/// Average collective, individual and early-termination outcomes per
/// 4-tuple configuration key, sorted ascending by key.
///
/// Records with a null key value are skipped, as are keys lacking either a
/// collective or an individual observation. Key fields absent from the table
/// leave every key incomplete, so the result is empty.
pub fn pareto_points(table: &RecordTable) -> Vec<ParetoPoint> {
    let missing = table.resolve_fields(&PARETO_KEY_FIELDS).missing;
    if !missing.is_empty() {
        return Vec::new();
    }

    let records = table.records();
    let mut points = Vec::new();
    for (key, indices) in table.group_indices(&PARETO_KEY_FIELDS) {
        let mut acc = PointAccumulator::default();
        for &i in &indices {
            let record = &records[i];
            acc.total.add_opt(record.number(COLLECTIVE_METRIC));
            acc.individual.add_opt(record.number(INDIVIDUAL_METRIC));
            acc.early.add_opt(record.observed_number(EARLY_TERMINATION));
        }
        let (Some(total), Some(individual)) = (acc.total.mean(), acc.individual.mean()) else {
            continue;
        };
        let [altruism, tau, fresh, mono]: [FieldValue; 4] = match key.0.try_into() {
            Ok(values) => values,
            Err(_) => continue,
        };
        points.push(ParetoPoint {
            altruism,
            tau,
            fresh,
            mono,
            total,
            individual,
            early: acc.early.mean(),
            runs: acc.total.count,
            individual_runs: acc.individual.count,
        });
    }

    tracing::debug!(points = points.len(), "built pareto points");
    points
}
