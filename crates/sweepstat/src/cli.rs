//! Command-line surface and report assembly

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sweepstat_core::{
    BootstrapConfig, DEFAULT_COMPONENTS, RecordTable, bootstrap_ci, build_faceted_grids,
    build_grid, component_means_by_altruism, correlation_matrix, group_summary, overall_summary,
    pairwise_deltas, pareto_points, player_metrics_long, score_buckets_by_altruism,
    seed_stability_curves,
};

use crate::load::LoadedResults;
use crate::report::{self, Section};

/// Columns coerced to numbers before any analysis
pub const NUMERIC_COLUMNS: &[&str] = &[
    "total_score",
    "player10_score",
    "player10_individual",
    "player10_rank",
    "player10_gap_to_best",
    "best_total_score",
    "conversation_length",
    "early_termination",
    "pause_count",
    "unique_items_used",
    "execution_time",
    "altruism_prob",
    "tau_margin",
    "epsilon_fresh",
    "epsilon_mono",
    "subjects",
    "memory_size",
    "min_samples_pid",
    "ewma_alpha",
    "importance_weight",
    "coherence_weight",
    "freshness_weight",
    "monotony_weight",
];

/// Default columns of the correlation view
pub const CORRELATION_COLUMNS: &[&str] = &[
    "altruism_prob",
    "tau_margin",
    "epsilon_fresh",
    "epsilon_mono",
    "importance_weight",
    "coherence_weight",
    "freshness_weight",
    "monotony_weight",
    "total_score",
    "player10_score",
    "early_termination",
    "pause_count",
    "unique_items_used",
    "length_utilization",
];

const OVERALL_DEFAULT: [&str; 4] = ["total_score", "player10_score", "player10_individual", "player10_rank"];
const CONFIG_KEYS: [&str; 4] = ["altruism_prob", "tau_margin", "epsilon_fresh", "epsilon_mono"];
const TOP_CONFIGURATIONS: usize = 10;
const TRACKED_PLAYER_CLASS: &str = "Player10";

/// Data views over the loaded results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Total score mean and std per altruism level
    Altruism,
    /// Metric pivot over --param1 x --param2
    Heatmap,
    /// Score distributions and shared components per altruism level
    Components,
    /// Collective vs individual trade-off points
    Pareto,
    /// Tracked player rank per altruism level
    Rank,
    /// Cumulative metric mean ordered by seed
    Seed,
    /// Correlation matrix
    Corr,
    /// One heatmap per level of --fixed
    MultiHeatmap,
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sweepstat")]
#[command(about = "Inspect saved parameter-sweep Monte Carlo results")]
pub struct Args {
    /// Path to results JSON file
    pub results_file: PathBuf,

    /// Print summary tables (field kinds, overall, top configurations)
    #[arg(long)]
    pub analysis: bool,

    /// Restrict summary tables to these columns
    #[arg(long, num_args = 1..)]
    pub analysis_columns: Vec<String>,

    /// Compute bootstrap confidence intervals by group
    #[arg(long)]
    pub ci: bool,

    /// Grouping columns for CI
    #[arg(long, num_args = 1.., default_value = "altruism_prob")]
    pub ci_group: Vec<String>,

    /// Metric used in bootstrap CI
    #[arg(long, default_value = "total_score")]
    pub ci_metric: String,

    /// Bootstrap iterations
    #[arg(long, default_value_t = sweepstat_core::bootstrap::DEFAULT_ITERATIONS)]
    pub ci_iterations: usize,

    /// Confidence level
    #[arg(long, default_value_t = sweepstat_core::bootstrap::DEFAULT_CONFIDENCE)]
    pub ci_confidence: f64,

    /// Report pairwise mean deltas & effect sizes
    #[arg(long)]
    pub pairwise: bool,

    /// Column defining pairwise cohorts
    #[arg(long, default_value = "altruism_prob")]
    pub pairwise_group: String,

    /// Metric analysed for pairwise deltas
    #[arg(long, default_value = "total_score")]
    pub pairwise_metric: String,

    /// Data views to print (repeatable)
    #[arg(long, value_enum)]
    pub view: Vec<View>,

    /// Primary parameter (rows) for heatmaps
    #[arg(long, default_value = "altruism_prob")]
    pub param1: String,

    /// Secondary parameter (cols) for heatmaps
    #[arg(long, default_value = "tau_margin")]
    pub param2: String,

    /// Metric for heatmaps and stability curves
    #[arg(long, default_value = "total_score")]
    pub metric: String,

    /// Facet parameter for multi-heatmap
    #[arg(long, default_value = "altruism_prob")]
    pub fixed: String,

    /// Random seed for bootstrap sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Trimmed, non-empty requested analysis columns
fn requested_columns(args: &Args) -> Vec<String> {
    args.analysis_columns
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Normalize the loaded results into a table with numeric columns coerced
pub fn build_table(loaded: &LoadedResults) -> RecordTable {
    let mut table = RecordTable::from_results(&loaded.results);
    table.coerce_numeric(NUMERIC_COLUMNS);
    table
}

fn analysis_sections(args: &Args, table: &RecordTable) -> Vec<Section> {
    let mut sections = Vec::new();
    let requested = requested_columns(args);
    let resolution = table.resolve_fields(&requested);
    let analysis_cols = resolution.present;

    sections.push(report::field_kinds_section(&table.field_kinds()));

    let overall_cols: Vec<String> = if analysis_cols.is_empty() {
        OVERALL_DEFAULT.iter().map(|c| c.to_string()).collect()
    } else {
        analysis_cols.clone()
    };
    let mut overall = report::overall_section(&overall_summary(table, &overall_cols));
    if !resolution.missing.is_empty() {
        overall = overall.with_note(format!(
            "Warning: columns not found in records: {}",
            resolution.missing.join(", ")
        ));
    }
    sections.push(overall);

    let group_cols: Vec<&str> = CONFIG_KEYS.iter().copied().filter(|c| table.has_field(c)).collect();
    let metrics: Vec<String> = if analysis_cols.is_empty() {
        vec!["total_score".to_string()]
    } else {
        analysis_cols
    };
    if group_cols.is_empty() {
        sections.push(Section::failure(
            "top_configurations",
            "Top configurations (group means)",
            "no configuration columns available",
        ));
    } else {
        match group_summary(table, &group_cols, &metrics) {
            Ok(summary) => sections.push(report::group_summary_section(&summary, TOP_CONFIGURATIONS)),
            Err(err) => sections.push(Section::failure(
                "top_configurations",
                "Top configurations (group means)",
                format!("Failed to summarize configurations: {err}"),
            )),
        }
    }
    sections
}

fn view_sections(args: &Args, view: View, table: &RecordTable, loaded: &LoadedResults) -> Vec<Section> {
    match view {
        View::Altruism => vec![match group_summary(table, &["altruism_prob"], &["total_score"]) {
            Ok(summary) => {
                let mut section = report::group_summary_section(&summary, usize::MAX);
                section.key = "altruism".to_string();
                section.title = "Total score vs altruism".to_string();
                section
            }
            Err(err) => Section::failure("altruism", "Total score vs altruism", err.to_string()),
        }],
        View::Heatmap => vec![
            match build_grid(table, &args.param1, &args.param2, &args.metric) {
                Ok(grid) => report::grid_section(&args.metric, grid.as_ref()),
                Err(err) => Section::failure("heatmap", format!("{} heatmap", args.metric), err.to_string()),
            },
        ],
        View::MultiHeatmap => {
            match build_faceted_grids(table, &args.fixed, &args.param1, &args.param2, &args.metric) {
                Ok(grids) => report::faceted_grid_sections(&args.metric, &args.fixed, &grids),
                Err(err) => vec![Section::failure(
                    "multi_heatmap",
                    format!("{} | {}", args.metric, args.fixed),
                    err.to_string(),
                )],
            }
        }
        View::Components => vec![
            report::score_buckets_section(&score_buckets_by_altruism(table)),
            report::component_means_section(component_means_by_altruism(table, &DEFAULT_COMPONENTS).as_ref()),
        ],
        View::Pareto => vec![report::pareto_section(&pareto_points(table))],
        View::Rank => {
            let players: Vec<_> = player_metrics_long(&loaded.results)
                .into_iter()
                .filter(|row| row.get("class_name").as_str() == Some(TRACKED_PLAYER_CLASS))
                .collect();
            let title = format!("{TRACKED_PLAYER_CLASS} rank by altruism");
            if players.is_empty() {
                return vec![Section::failure("rank", title, "No per-player metrics available.")];
            }
            let players = RecordTable::from_records(players);
            match group_summary(&players, &["altruism_prob"], &["rank"]) {
                Ok(summary) => {
                    let mut section = report::group_summary_section(&summary, usize::MAX);
                    section.key = "rank".to_string();
                    section.title = title;
                    vec![section]
                }
                Err(err) => vec![Section::failure("rank", title, err.to_string())],
            }
        }
        View::Seed => vec![
            match seed_stability_curves(table, "altruism_prob", &args.metric, "seed") {
                Ok(curves) => report::stability_section("altruism_prob", &args.metric, &curves),
                Err(err) => Section::failure(
                    "seed_stability",
                    format!("Seed stability for {}", args.metric),
                    err.to_string(),
                ),
            },
        ],
        View::Corr => {
            let requested = requested_columns(args);
            let columns: Vec<String> = if requested.is_empty() {
                CORRELATION_COLUMNS.iter().map(|c| c.to_string()).collect()
            } else {
                requested
            };
            vec![report::correlation_section(&correlation_matrix(table, Some(columns.as_slice())))]
        }
    }
}

/// Build every requested report section.
///
/// A failing operation becomes a section carrying its error message; the
/// other sections are still produced.
pub fn build_sections(args: &Args, loaded: &LoadedResults) -> Vec<Section> {
    let table = build_table(loaded);
    tracing::debug!(rows = table.len(), columns = table.schema().len(), "normalized results");
    let mut sections = Vec::new();

    if args.analysis {
        sections.extend(analysis_sections(args, &table));
    }

    if args.ci {
        let group: Vec<String> = args
            .ci_group
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let config = BootstrapConfig {
            iterations: args.ci_iterations,
            confidence: args.ci_confidence,
            seed: args.seed,
        };
        sections.push(match bootstrap_ci(&table, &group, &args.ci_metric, &config) {
            Ok(rows) => report::bootstrap_section(&group, &args.ci_metric, &rows),
            Err(err) => {
                tracing::warn!(error = %err, "bootstrap CI failed");
                Section::failure(
                    "bootstrap_ci",
                    "Bootstrap confidence intervals",
                    format!("Failed to compute bootstrap CI: {err}"),
                )
            }
        });
    }

    if args.pairwise {
        sections.push(match pairwise_deltas(&table, &args.pairwise_group, &args.pairwise_metric) {
            Ok(deltas) => report::pairwise_section(&args.pairwise_group, &args.pairwise_metric, &deltas),
            Err(err) => {
                tracing::warn!(error = %err, "pairwise deltas failed");
                Section::failure(
                    "pairwise_deltas",
                    "Pairwise deltas",
                    format!("Failed to compute pairwise deltas: {err}"),
                )
            }
        });
    }

    for &view in &args.view {
        sections.extend(view_sections(args, view, &table, loaded));
    }
    sections
}

/// Render sections in the requested format
pub fn render(args: &Args, sections: &[Section]) -> serde_json::Result<String> {
    match args.format {
        OutputFormat::Text => Ok(report::render_text(sections)),
        OutputFormat::Json => report::render_json(sections),
    }
}
