//! Grouped descriptive statistics
//!
//! One row per distinct combination of grouping-field values, carrying the
//! mean and sample standard deviation of each requested metric. Rows come
//! back ranked by the primary metric's mean, best first.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::Result;
use crate::model::GroupKey;
use crate::stats;
use crate::table::RecordTable;

/// Mean / standard deviation / count of one metric over a set of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    /// `None` when no record carries a value
    pub mean: Option<f64>,
    /// Sample standard deviation, `None` below two values
    pub std_dev: Option<f64>,
    /// Number of non-null values
    pub n: usize,
}

impl MetricSummary {
    fn from_values(metric: &str, values: &[f64]) -> Self {
        Self {
            metric: metric.to_string(),
            mean: stats::mean(values),
            std_dev: stats::sample_std(values),
            n: values.len(),
        }
    }
}

/// One group of the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: GroupKey,
    /// Records in the group, whether or not they carry the metrics
    pub count: usize,
    /// One entry per resolved metric, in request order
    pub metrics: Vec<MetricSummary>,
}

impl GroupRow {
    /// Summary for `metric`, if it was requested
    pub fn metric(&self, metric: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

/// Grouped summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group_fields: Vec<String>,
    /// Metrics that resolved against the schema
    pub metrics: Vec<String>,
    pub rows: Vec<GroupRow>,
}

impl GroupSummary {
    /// The first `n` rows ("top configurations")
    pub fn top(&self, n: usize) -> &[GroupRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Total records across all groups
    pub fn total_count(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }
}

/// Descending by mean with missing means last
fn rank_by_mean(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Group `table` by `group_fields` and summarize each of `metrics`.
///
/// Grouping fields must exist in the table. Metrics that do not exist are
/// dropped with a warning; rows are still produced with their counts.
pub fn group_summary<G: AsRef<str>, M: AsRef<str>>(
    table: &RecordTable,
    group_fields: &[G],
    metrics: &[M],
) -> Result<GroupSummary> {
    table.require_group_fields(group_fields)?;
    let metrics = table.resolve_fields(metrics).present;

    let mut rows: Vec<GroupRow> = table
        .group_indices(group_fields)
        .into_iter()
        .map(|(key, indices)| GroupRow {
            count: indices.len(),
            metrics: metrics
                .iter()
                .map(|metric| MetricSummary::from_values(metric, &table.numbers_at(&indices, metric)))
                .collect(),
            key,
        })
        .collect();

    if let Some(primary) = metrics.first() {
        rows.sort_by(|a, b| {
            let a_mean = a.metric(primary).and_then(|m| m.mean);
            let b_mean = b.metric(primary).and_then(|m| m.mean);
            rank_by_mean(a_mean, b_mean).then_with(|| a.key.cmp(&b.key))
        });
    }

    tracing::debug!(groups = rows.len(), metrics = metrics.len(), "computed group summary");
    Ok(GroupSummary {
        group_fields: group_fields.iter().map(|f| f.as_ref().to_string()).collect(),
        metrics,
        rows,
    })
}

/// Ungrouped summary of each metric over the whole table.
///
/// Metrics missing from the schema are skipped with a warning.
pub fn overall_summary<M: AsRef<str>>(table: &RecordTable, metrics: &[M]) -> Vec<MetricSummary> {
    let all: Vec<usize> = (0..table.len()).collect();
    table
        .resolve_fields(metrics)
        .present
        .iter()
        .map(|metric| MetricSummary::from_values(metric, &table.numbers_at(&all, metric)))
        .collect()
}
