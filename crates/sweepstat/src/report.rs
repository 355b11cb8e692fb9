//! Report rendering
//!
//! Each requested analysis becomes a [`Section`]: a titled text table for
//! terminal output plus a JSON value for machine consumption.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Value, json};
use sweepstat_core::buckets::{ComponentMeans, ScoreBucket};
use sweepstat_core::{
    BootstrapRow, CorrelationMatrix, FieldKind, FieldValue, GroupSummary, MetricSummary,
    PairwiseDelta, ParetoPoint, PivotGrid, stats,
};

/// Placeholder for missing or undefined numbers
pub const MISSING: &str = "n/a";

/// Two-decimal rendering with `n/a` for missing and NaN values
pub fn format_float(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.2}"),
        _ => MISSING.to_string(),
    }
}

fn format_level(value: &FieldValue) -> String {
    if value.is_null() { MISSING.to_string() } else { value.to_string() }
}

/// Plain text table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Right-aligned columns separated by two spaces
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let mut out = String::new();
        let line = |cells: &[String], out: &mut String| {
            let parts: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .collect();
            out.push_str(parts.join("  ").trim_end());
            out.push('\n');
        };
        line(&self.headers, &mut out);
        for row in &self.rows {
            line(row, &mut out);
        }
        out
    }
}

/// One titled block of the report
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Key of the section in JSON output
    pub key: String,
    pub title: String,
    pub table: Table,
    pub json: Value,
    /// Extra lines printed before the table
    pub notes: Vec<String>,
}

impl Section {
    pub fn new(key: impl Into<String>, title: impl Into<String>, table: Table, json: Value) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            table,
            json,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Section reporting a failed operation
    pub fn failure(key: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(key, title, Table::default(), json!({ "error": message })).with_note(message)
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("\n=== {} ===\n", self.title);
        for note in &self.notes {
            let _ = writeln!(out, "{note}");
        }
        if self.table.is_empty() {
            if self.notes.is_empty() {
                out.push_str("(no data)\n");
            }
        } else {
            out.push_str(&self.table.render());
        }
        out
    }
}

/// All sections as text
pub fn render_text(sections: &[Section]) -> String {
    sections.iter().map(Section::render_text).collect()
}

/// All sections as one pretty-printed JSON object keyed by section
pub fn render_json(sections: &[Section]) -> serde_json::Result<String> {
    let map: serde_json::Map<String, Value> = sections
        .iter()
        .map(|s| (s.key.clone(), s.json.clone()))
        .collect();
    serde_json::to_string_pretty(&Value::Object(map))
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ============================================================================
// Section builders
// ============================================================================

pub fn field_kinds_section(kinds: &[(String, FieldKind)]) -> Section {
    let mut table = Table::new(["field", "kind"]);
    for (field, kind) in kinds {
        table.push(vec![field.clone(), kind.label().to_string()]);
    }
    let json: serde_json::Map<String, Value> = kinds
        .iter()
        .map(|(field, kind)| (field.clone(), Value::from(kind.label())))
        .collect();
    Section::new("field_kinds", "Field kinds", table, Value::Object(json))
}

pub fn overall_section(summaries: &[MetricSummary]) -> Section {
    let mut table = Table::new(["metric", "mean", "std", "n"]);
    for s in summaries {
        table.push(vec![
            s.metric.clone(),
            format_float(s.mean),
            format_float(s.std_dev),
            s.n.to_string(),
        ]);
    }
    Section::new("overall", "OVERALL", table, to_json(&summaries))
}

/// Group summary limited to its first `top` rows
pub fn group_summary_section(summary: &GroupSummary, top: usize) -> Section {
    let mut headers = summary.group_fields.clone();
    for metric in &summary.metrics {
        headers.push(format!("{metric}_mean"));
        headers.push(format!("{metric}_std"));
    }
    headers.push("count".to_string());

    let mut table = Table::new(headers);
    let rows = summary.top(top);
    for row in rows {
        let mut cells: Vec<String> = row.key.values().iter().map(format_level).collect();
        for m in &row.metrics {
            cells.push(format_float(m.mean));
            cells.push(format_float(m.std_dev));
        }
        cells.push(row.count.to_string());
        table.push(cells);
    }
    Section::new(
        "top_configurations",
        "Top configurations (group means)",
        table,
        json!({
            "group_fields": summary.group_fields,
            "metrics": summary.metrics,
            "rows": to_json(&rows),
        }),
    )
}

pub fn bootstrap_section(group_fields: &[String], metric: &str, rows: &[BootstrapRow]) -> Section {
    let mut headers = group_fields.to_vec();
    headers.extend(["mean", "ci_low", "ci_high", "n"].map(String::from));
    let mut table = Table::new(headers);
    for row in rows {
        let mut cells: Vec<String> = row.key.values().iter().map(format_level).collect();
        cells.push(format_float(Some(row.mean)));
        cells.push(format_float(Some(row.ci_low)));
        cells.push(format_float(Some(row.ci_high)));
        cells.push(row.n.to_string());
        table.push(cells);
    }
    Section::new(
        "bootstrap_ci",
        format!("Bootstrap confidence intervals ({metric})"),
        table,
        to_json(&rows),
    )
}

pub fn pairwise_section(group_field: &str, metric: &str, deltas: &[PairwiseDelta]) -> Section {
    let mut table = Table::new(["a", "b", "delta_mean", "cohens_d", "n_a", "n_b"]);
    for d in deltas {
        table.push(vec![
            format_level(&d.a),
            format_level(&d.b),
            format_float(Some(d.delta_mean)),
            format_float(Some(d.cohens_d)),
            d.n_a.to_string(),
            d.n_b.to_string(),
        ]);
    }
    Section::new(
        "pairwise_deltas",
        format!("Pairwise deltas ({metric} by {group_field})"),
        table,
        to_json(&deltas),
    )
}

fn grid_table(grid: &PivotGrid) -> Table {
    let mut headers = vec![format!("{} \\ {}", grid.row_field, grid.col_field)];
    headers.extend(grid.cols.iter().map(format_level));
    let mut table = Table::new(headers);
    for (level, row) in grid.rows.iter().zip(grid.cells.iter_rows()) {
        let mut cells = vec![format_level(level)];
        cells.extend(row.iter().map(|cell| format_float(*cell)));
        table.push(cells);
    }
    table
}

pub fn grid_section(metric: &str, grid: Option<&PivotGrid>) -> Section {
    let title = format!("{metric} heatmap");
    match grid {
        Some(grid) => Section::new("heatmap", title, grid_table(grid), to_json(grid)),
        None => Section::new("heatmap", title, Table::default(), Value::Null),
    }
}

/// One section per facet level, all under the `multi_heatmap` JSON key
pub fn faceted_grid_sections(metric: &str, facet_field: &str, grids: &BTreeMap<FieldValue, PivotGrid>) -> Vec<Section> {
    let json: Vec<Value> = grids
        .iter()
        .map(|(level, grid)| json!({ "level": level, "grid": to_json(grid) }))
        .collect();
    let mut sections: Vec<Section> = grids
        .iter()
        .map(|(level, grid)| {
            Section::new(
                format!("multi_heatmap[{level}]"),
                format!("{metric} | {facet_field}={}", format_level(level)),
                grid_table(grid),
                Value::Null,
            )
        })
        .collect();
    // JSON output carries the facets once, on the first section
    match sections.first_mut() {
        Some(first) => {
            first.key = "multi_heatmap".to_string();
            first.json = Value::Array(json);
        }
        None => sections.push(Section::new(
            "multi_heatmap",
            format!("{metric} | {facet_field}"),
            Table::default(),
            Value::Array(Vec::new()),
        )),
    }
    sections
}

pub fn pareto_section(points: &[ParetoPoint]) -> Section {
    let mut table = Table::new(["altruism", "tau", "fresh", "mono", "total", "player10", "early", "runs"]);
    for p in points {
        table.push(vec![
            format_level(&p.altruism),
            format_level(&p.tau),
            format_level(&p.fresh),
            format_level(&p.mono),
            format_float(Some(p.total)),
            format_float(Some(p.individual)),
            format_float(p.early),
            p.runs.to_string(),
        ]);
    }
    Section::new("pareto", "Pareto trade-off points", table, to_json(&points))
}

pub fn stability_section(group_field: &str, metric: &str, curves: &BTreeMap<FieldValue, Vec<f64>>) -> Section {
    let mut table = Table::new([group_field, "runs", "first", "final", "spread_last_half"]);
    for (level, curve) in curves {
        // Range of the cumulative mean over the later half of the runs
        let tail = &curve[curve.len() / 2..];
        let spread = match (
            tail.iter().copied().reduce(f64::min),
            tail.iter().copied().reduce(f64::max),
        ) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        };
        table.push(vec![
            format_level(level),
            curve.len().to_string(),
            format_float(curve.first().copied()),
            format_float(curve.last().copied()),
            format_float(spread),
        ]);
    }
    let json: Vec<Value> = curves
        .iter()
        .map(|(level, curve)| json!({ "level": level, "curve": curve }))
        .collect();
    Section::new(
        "seed_stability",
        format!("Seed stability for {metric}"),
        table,
        Value::Array(json),
    )
}

pub fn correlation_section(matrix: &CorrelationMatrix) -> Section {
    let mut headers = vec![String::new()];
    headers.extend(matrix.fields.iter().cloned());
    let mut table = Table::new(headers);
    for (field, row) in matrix.fields.iter().zip(matrix.values.iter_rows()) {
        let mut cells = vec![field.clone()];
        cells.extend(row.iter().map(|cell| format_float(*cell)));
        table.push(cells);
    }
    Section::new("correlation", "Correlation matrix", table, to_json(matrix))
}

pub fn score_buckets_section(buckets: &BTreeMap<FieldValue, ScoreBucket>) -> Section {
    let mut table = Table::new(["altruism_prob", "runs", "total_mean", "total_min", "total_max", "player10_mean"]);
    for (level, bucket) in buckets {
        table.push(vec![
            format_level(level),
            bucket.total.len().to_string(),
            format_float(stats::mean(&bucket.total)),
            format_float(bucket.total.iter().copied().reduce(f64::min)),
            format_float(bucket.total.iter().copied().reduce(f64::max)),
            format_float(stats::mean(&bucket.player10)),
        ]);
    }
    let json: Vec<Value> = buckets
        .iter()
        .map(|(level, bucket)| json!({ "level": level, "total": bucket.total, "player10": bucket.player10 }))
        .collect();
    Section::new(
        "score_buckets",
        "Total score distribution by altruism",
        table,
        Value::Array(json),
    )
}

pub fn component_means_section(means: Option<&ComponentMeans>) -> Section {
    let title = "Shared score components by altruism";
    let Some(means) = means else {
        return Section::new("component_means", title, Table::default(), Value::Null);
    };
    let mut headers = vec!["altruism_prob".to_string()];
    headers.extend(means.series.keys().cloned());
    let mut table = Table::new(headers);
    for (i, level) in means.levels.iter().enumerate() {
        let mut cells = vec![format_level(level)];
        cells.extend(means.series.values().map(|series| format_float(series[i])));
        table.push(cells);
    }
    Section::new("component_means", title, table, to_json(means))
}
