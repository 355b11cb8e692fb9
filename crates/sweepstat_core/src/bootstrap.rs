//! Bootstrap confidence intervals
//!
//! For every group, resample the group's metric values with replacement
//! `iterations` times, take the mean of each resample, and report the
//! empirical `alpha` and `1 - alpha` quantiles of those means, with
//! `alpha = (1 - confidence) / 2`.
//!
//! Groups are visited in ascending key order and each resample draws its
//! indices in sequence, so a seeded run consumes the random stream in a
//! fixed order and reproduces bit-identical intervals.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::model::GroupKey;
use crate::stats;
use crate::table::RecordTable;

/// Default number of bootstrap resamples per group
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Default two-sided confidence level
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Parameters of a bootstrap run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Resamples drawn per group
    pub iterations: usize,
    /// Two-sided confidence level, strictly inside (0, 1)
    pub confidence: f64,
    /// Seed for reproducible resampling; `None` draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            confidence: DEFAULT_CONFIDENCE,
            seed: None,
        }
    }
}

impl BootstrapConfig {
    /// Default parameters with a fixed seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate(self.iterations, self.confidence)
    }

    /// Whether results are reproducible across runs
    pub fn is_reproducible(&self) -> bool {
        self.seed.is_some()
    }
}

fn validate(iterations: usize, confidence: f64) -> Result<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(StatsError::InvalidConfidence(confidence));
    }
    if iterations == 0 {
        return Err(StatsError::InvalidIterations(iterations));
    }
    Ok(())
}

/// Interval estimate for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapRow {
    pub key: GroupKey,
    /// Sample mean of the group's values
    pub mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// Non-null values in the group
    pub n: usize,
}

impl BootstrapRow {
    pub fn width(&self) -> f64 {
        self.ci_high - self.ci_low
    }
}

/// Bootstrap intervals for `metric` grouped by `group_fields`.
///
/// With `config.seed` set the result is reproducible; without it the
/// resampler is seeded from OS entropy.
pub fn bootstrap_ci<G: AsRef<str>>(
    table: &RecordTable,
    group_fields: &[G],
    metric: &str,
    config: &BootstrapConfig,
) -> Result<Vec<BootstrapRow>> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            tracing::debug!("bootstrap resampling without a seed; results are not reproducible");
            StdRng::from_os_rng()
        }
    };
    bootstrap_ci_with_rng(
        table,
        group_fields,
        metric,
        config.iterations,
        config.confidence,
        &mut rng,
    )
}

/// Bootstrap intervals drawing from a caller-supplied random source.
pub fn bootstrap_ci_with_rng<G: AsRef<str>, R: Rng + ?Sized>(
    table: &RecordTable,
    group_fields: &[G],
    metric: &str,
    iterations: usize,
    confidence: f64,
    rng: &mut R,
) -> Result<Vec<BootstrapRow>> {
    validate(iterations, confidence)?;
    table.require_group_fields(group_fields)?;
    if !table.resolve_metric(metric) {
        return Ok(Vec::new());
    }

    let alpha = (1.0 - confidence) / 2.0;
    let mut rows = Vec::new();
    let mut means = Vec::with_capacity(iterations);

    for (key, indices) in table.group_indices(group_fields) {
        let values = table.numbers_at(&indices, metric);
        let Some(mean) = stats::mean(&values) else {
            continue;
        };
        let n = values.len();

        means.clear();
        for _ in 0..iterations {
            let mut sum = 0.0;
            for _ in 0..n {
                sum += values[rng.random_range(0..n)];
            }
            means.push(sum / n as f64);
        }
        means.sort_by(f64::total_cmp);

        // means is non-empty because iterations >= 1
        let ci_low = stats::quantile_sorted(&means, alpha).unwrap_or(mean);
        let ci_high = stats::quantile_sorted(&means, 1.0 - alpha).unwrap_or(mean);
        rows.push(BootstrapRow {
            key,
            mean,
            ci_low,
            ci_high,
            n,
        });
    }

    tracing::debug!(groups = rows.len(), iterations, confidence, "computed bootstrap intervals");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use crate::normalize::NormalizedRecord;

    fn table(values: &[(f64, Option<f64>)]) -> RecordTable {
        RecordTable::from_records(
            values
                .iter()
                .map(|&(group, score)| {
                    NormalizedRecord::new()
                        .with("altruism_prob", group)
                        .with("total_score", score)
                })
                .collect(),
        )
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let table = table(&[(0.2, Some(10.0)), (0.2, Some(25.0)), (0.2, Some(13.0)), (0.5, Some(40.0)), (0.5, Some(60.0))]);
        let config = BootstrapConfig::seeded(42);
        let first = bootstrap_ci(&table, &["altruism_prob"], "total_score", &config).unwrap();
        let second = bootstrap_ci(&table, &["altruism_prob"], "total_score", &config).unwrap();

        assert_eq!(first.len(), 2);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.mean.to_bits(), b.mean.to_bits());
            assert_eq!(a.ci_low.to_bits(), b.ci_low.to_bits());
            assert_eq!(a.ci_high.to_bits(), b.ci_high.to_bits());
            assert_eq!(a.n, b.n);
        }
    }

    #[test]
    fn test_interval_brackets_mean_within_data_range() {
        let table = table(&[(0.2, Some(10.0)), (0.2, Some(20.0)), (0.2, Some(30.0)), (0.2, None)]);
        let rows = bootstrap_ci(&table, &["altruism_prob"], "total_score", &BootstrapConfig::seeded(7)).unwrap();

        let row = &rows[0];
        assert_eq!(row.n, 3);
        assert_eq!(row.mean, 20.0);
        assert!(row.ci_low >= 10.0 && row.ci_low <= row.mean);
        assert!(row.ci_high <= 30.0 && row.ci_high >= row.mean);
    }

    #[test]
    fn test_constant_group_has_degenerate_interval() {
        let table = table(&[(0.2, Some(5.0)), (0.2, Some(5.0))]);
        let rows = bootstrap_ci(&table, &["altruism_prob"], "total_score", &BootstrapConfig::seeded(1)).unwrap();
        assert_eq!(rows[0].ci_low, 5.0);
        assert_eq!(rows[0].ci_high, 5.0);
    }

    #[test]
    fn test_empty_groups_are_omitted() {
        let table = table(&[(0.2, None), (0.5, Some(1.0))]);
        let rows = bootstrap_ci(&table, &["altruism_prob"], "total_score", &BootstrapConfig::seeded(3)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.first(), &FieldValue::from(0.5));
    }

    #[test]
    fn test_invalid_parameters() {
        let table = table(&[(0.2, Some(1.0))]);
        for confidence in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let config = BootstrapConfig {
                confidence,
                ..BootstrapConfig::seeded(1)
            };
            let err = bootstrap_ci(&table, &["altruism_prob"], "total_score", &config).unwrap_err();
            assert!(matches!(err, StatsError::InvalidConfidence(_)));
        }

        let config = BootstrapConfig {
            iterations: 0,
            ..BootstrapConfig::seeded(1)
        };
        assert_eq!(
            bootstrap_ci(&table, &["altruism_prob"], "total_score", &config),
            Err(StatsError::InvalidIterations(0))
        );
    }

    #[test]
    fn test_missing_metric_yields_no_rows() {
        let table = table(&[(0.2, Some(1.0))]);
        let rows = bootstrap_ci(&table, &["altruism_prob"], "nope", &BootstrapConfig::seeded(1)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_higher_confidence_widens_interval() {
        let table = table(&[(0.2, Some(1.0)), (0.2, Some(4.0)), (0.2, Some(9.0)), (0.2, Some(16.0)), (0.2, Some(25.0))]);
        let narrow = BootstrapConfig {
            confidence: 0.5,
            ..BootstrapConfig::seeded(11)
        };
        let wide = BootstrapConfig {
            confidence: 0.99,
            ..BootstrapConfig::seeded(11)
        };
        let narrow = bootstrap_ci(&table, &["altruism_prob"], "total_score", &narrow).unwrap();
        let wide = bootstrap_ci(&table, &["altruism_prob"], "total_score", &wide).unwrap();
        assert!(wide[0].width() > narrow[0].width());
    }

    #[test]
    fn test_caller_supplied_rng() {
        let table = table(&[(0.2, Some(1.0)), (0.2, Some(3.0))]);
        let mut rng = StdRng::seed_from_u64(5);
        let rows = bootstrap_ci_with_rng(&table, &["altruism_prob"], "total_score", 200, 0.9, &mut rng).unwrap();
        assert_eq!(rows[0].n, 2);
        assert!(rows[0].ci_low >= 1.0 && rows[0].ci_high <= 3.0);
    }
}
