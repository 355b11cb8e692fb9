//! Pairwise contrasts between levels of one grouping dimension
//!
//! For every pair of levels `(a, b)` with `a < b` the contrast reports
//! `mean(b) - mean(a)` and Cohen's d against the pooled standard deviation.

use serde::Serialize;

use crate::error::Result;
use crate::model::FieldValue;
use crate::stats;
use crate::table::RecordTable;

/// Mean difference and effect size between two levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseDelta {
    pub a: FieldValue,
    pub b: FieldValue,
    /// `mean(b) - mean(a)`
    pub delta_mean: f64,
    /// `NaN` when the pooled standard deviation is zero or undefined
    pub cohens_d: f64,
    pub n_a: usize,
    pub n_b: usize,
}

/// Cohen's d for `delta` given both samples.
///
/// The pooled deviation uses Bessel-corrected variances, so a level with a
/// single observation leaves it undefined. Undefined or zero pooled
/// deviation gives `NaN`.
pub fn cohens_d(delta: f64, a: &[f64], b: &[f64]) -> f64 {
    let (Some(var_a), Some(var_b)) = (stats::sample_variance(a), stats::sample_variance(b)) else {
        return f64::NAN;
    };
    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let pooled = (((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / (n_a + n_b - 2.0)).sqrt();
    if pooled > 0.0 {
        delta / pooled
    } else {
        f64::NAN
    }
}

/// Contrast every pair of distinct non-null levels of `group_field` on `metric`.
///
/// Levels without any metric observation are skipped. A metric missing from
/// the table yields no contrasts.
pub fn pairwise_deltas(table: &RecordTable, group_field: &str, metric: &str) -> Result<Vec<PairwiseDelta>> {
    table.require_group_fields(&[group_field])?;
    if !table.resolve_metric(metric) {
        return Ok(Vec::new());
    }

    let levels: Vec<(FieldValue, Vec<f64>)> = table
        .group_indices(&[group_field])
        .into_iter()
        .map(|(key, indices)| (key.first().clone(), table.numbers_at(&indices, metric)))
        .filter(|(_, values)| !values.is_empty())
        .collect();

    let mut deltas = Vec::new();
    for (i, (a, x)) in levels.iter().enumerate() {
        let mean_a = stats::mean(x).unwrap_or(f64::NAN);
        for (b, y) in &levels[i + 1..] {
            let mean_b = stats::mean(y).unwrap_or(f64::NAN);
            let delta = mean_b - mean_a;
            deltas.push(PairwiseDelta {
                a: a.clone(),
                b: b.clone(),
                delta_mean: delta,
                cohens_d: cohens_d(delta, x, y),
                n_a: x.len(),
                n_b: y.len(),
            });
        }
    }

    tracing::debug!(levels = levels.len(), pairs = deltas.len(), "computed pairwise deltas");
    Ok(deltas)
}
