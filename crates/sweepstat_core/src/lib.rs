//! Statistics for parameter-sweep Monte Carlo results
//!
//! This crate turns batches of per-run simulation results into summaries:
//! - Flattening heterogeneous results into normalized records
//! - Grouped means and standard deviations
//! - Bootstrap confidence intervals
//! - Pairwise mean differences with Cohen's d
//! - Two-dimensional pivots, optionally faceted by a third field
//! - Collective vs individual trade-off points
//! - Seed stability curves and correlation matrices
//!
//! Every operation is a pure function of a [`RecordTable`] and its
//! parameters; nothing is cached between calls.
//!
//! ```ignore
//! use sweepstat_core::{BootstrapConfig, RecordTable, bootstrap_ci, group_summary};
//!
//! let table = RecordTable::from_results(&results);
//! let summary = group_summary(&table, &["altruism_prob", "tau_margin"], &["total_score"])?;
//! let intervals = bootstrap_ci(&table, &["altruism_prob"], "total_score", &BootstrapConfig::seeded(7))?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod bootstrap;
pub mod buckets;
pub mod contrast;
pub mod correlation;
pub mod error;
pub mod grid;
pub mod normalize;
pub mod pareto;
pub mod stability;
pub mod stats;
pub mod table;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use aggregate::{GroupRow, GroupSummary, MetricSummary, group_summary, overall_summary};
pub use bootstrap::{BootstrapConfig, BootstrapRow, bootstrap_ci, bootstrap_ci_with_rng};
pub use buckets::{
    ComponentMeans, DEFAULT_COMPONENTS, ScoreBucket, component_means_by_altruism,
    score_buckets_by_altruism,
};
pub use contrast::{PairwiseDelta, cohens_d, pairwise_deltas};
pub use correlation::{CorrelationMatrix, correlation_matrix};
pub use error::{Result, StatsError};
pub use grid::{Grid, GridSpec, PivotGrid, build_faceted_grids, build_grid};
pub use model::{FieldSource, FieldValue, GroupKey, SimulationResult};
pub use normalize::{NormalizedRecord, normalize_result, player_metrics_long, results_to_records};
pub use pareto::{ParetoPoint, pareto_points};
pub use stability::seed_stability_curves;
pub use table::{FieldKind, RecordTable};
