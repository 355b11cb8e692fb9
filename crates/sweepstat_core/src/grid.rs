//! Two-dimensional pivots of a metric
//!
//! A pivot indexes a metric's per-cell mean by the sorted distinct values of
//! two fields. Cells are accumulated as running sums and counts, and a cell
//! no record lands in stays `None` so the grid keeps its rectangular shape.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::model::FieldValue;
use crate::normalize::NormalizedRecord;
use crate::stats::MeanAccumulator;
use crate::table::RecordTable;

/// Dense 2D storage with a flat backing array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone> Grid<T> {
    /// Create a `rows x cols` grid filled with `default`.
    pub fn new(rows: usize, cols: usize, default: T) -> Self {
        Self {
            data: vec![default; rows * cols],
            rows,
            cols,
        }
    }
}

impl<T> Grid<T> {
    /// Create a grid from row-major data; `None` if the length does not match.
    pub fn from_data(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { data, rows, cols })
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(row, col)`, `None` when out of bounds
    pub fn flat_index(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.flat_index(row, col).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.flat_index(row, col).map(|i| &mut self.data[i])
    }

    /// Set the value at `(row, col)`; `false` when out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        if let Some(cell) = self.get_mut(row, col) {
            *cell = value;
            true
        } else {
            false
        }
    }

    /// One row as a slice
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.data[row * self.cols..(row + 1) * self.cols])
    }

    /// Iterate over rows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).filter_map(|r| self.row(r))
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }
}

/// Serializes as a list of rows
impl<T: Serialize> Serialize for Grid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for row in self.iter_rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// Mean of a metric per (row value, column value) cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotGrid {
    pub row_field: String,
    pub col_field: String,
    pub metric: String,
    /// Sorted distinct row values
    pub rows: Vec<FieldValue>,
    /// Sorted distinct column values
    pub cols: Vec<FieldValue>,
    /// `None` where no record contributes
    pub cells: Grid<Option<f64>>,
    /// Records contributing to each cell
    #[serde(skip)]
    pub counts: Grid<usize>,
}

impl PivotGrid {
    /// Cell value looked up by row and column value
    pub fn value(&self, row: &FieldValue, col: &FieldValue) -> Option<f64> {
        let r = self.rows.binary_search(row).ok()?;
        let c = self.cols.binary_search(col).ok()?;
        self.cells.get(r, c).copied().flatten()
    }

    /// Cells as nested rows
    pub fn to_nested(&self) -> Vec<Vec<Option<f64>>> {
        self.cells.iter_rows().map(<[Option<f64>]>::to_vec).collect()
    }
}

/// Row field, column field and metric of a pivot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub row_field: String,
    pub col_field: String,
    pub metric: String,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            row_field: "altruism_prob".to_string(),
            col_field: "tau_margin".to_string(),
            metric: "total_score".to_string(),
        }
    }
}

fn accumulate<'a>(
    records: impl Iterator<Item = &'a NormalizedRecord>,
    spec: &GridSpec,
) -> Option<PivotGrid> {
    let mut cells: FxHashMap<(FieldValue, FieldValue), MeanAccumulator> = FxHashMap::default();
    let mut row_values = BTreeSet::new();
    let mut col_values = BTreeSet::new();

    for record in records {
        let row = record.get(&spec.row_field);
        let col = record.get(&spec.col_field);
        let Some(value) = record.number(&spec.metric) else {
            continue;
        };
        if row.is_null() || col.is_null() {
            continue;
        }
        row_values.insert(row.clone());
        col_values.insert(col.clone());
        cells.entry((row.clone(), col.clone())).or_default().add(value);
    }

    if row_values.is_empty() || col_values.is_empty() {
        return None;
    }

    let rows: Vec<FieldValue> = row_values.into_iter().collect();
    let cols: Vec<FieldValue> = col_values.into_iter().collect();
    let mut means = Grid::new(rows.len(), cols.len(), None);
    let mut counts = Grid::new(rows.len(), cols.len(), 0);
    for ((row, col), acc) in cells {
        // Both lookups succeed: the axes were built from these keys
        if let (Ok(r), Ok(c)) = (rows.binary_search(&row), cols.binary_search(&col)) {
            means.set(r, c, acc.mean());
            counts.set(r, c, acc.count);
        }
    }

    Some(PivotGrid {
        row_field: spec.row_field.clone(),
        col_field: spec.col_field.clone(),
        metric: spec.metric.clone(),
        rows,
        cols,
        cells: means,
        counts,
    })
}

/// Pivot `metric` by `row_field` x `col_field`.
///
/// Returns `None` when no record has non-null row, column and metric values.
pub fn build_grid(
    table: &RecordTable,
    row_field: &str,
    col_field: &str,
    metric: &str,
) -> Result<Option<PivotGrid>> {
    table.require_group_fields(&[row_field, col_field])?;
    if !table.resolve_metric(metric) {
        return Ok(None);
    }
    let spec = GridSpec {
        row_field: row_field.to_string(),
        col_field: col_field.to_string(),
        metric: metric.to_string(),
    };
    Ok(accumulate(table.records().iter(), &spec))
}

/// One pivot per level of `facet_field`, each built independently.
///
/// Facet levels whose records produce no cells are absent from the map.
pub fn build_faceted_grids(
    table: &RecordTable,
    facet_field: &str,
    row_field: &str,
    col_field: &str,
    metric: &str,
) -> Result<BTreeMap<FieldValue, PivotGrid>> {
    table.require_group_fields(&[facet_field, row_field, col_field])?;
    if !table.resolve_metric(metric) {
        return Ok(BTreeMap::new());
    }
    let spec = GridSpec {
        row_field: row_field.to_string(),
        col_field: col_field.to_string(),
        metric: metric.to_string(),
    };

    let records = table.records();
    let mut facets = BTreeMap::new();
    for (key, indices) in table.group_indices(&[facet_field]) {
        if let Some(grid) = accumulate(indices.iter().map(|&i| &records[i]), &spec) {
            facets.insert(key.first().clone(), grid);
        }
    }
    tracing::debug!(facets = facets.len(), "built faceted grids");
    Ok(facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;

    fn record(row: f64, col: f64, value: Option<f64>) -> NormalizedRecord {
        NormalizedRecord::new()
            .with("memory_size", row)
            .with("seed", col)
            .with("total_score", value)
    }

    #[test]
    fn test_grid_storage() {
        let mut grid = Grid::new(2, 3, 0);
        assert_eq!(grid.shape(), (2, 3));
        assert!(grid.set(1, 2, 7));
        assert!(!grid.set(2, 0, 7));
        assert_eq!(grid.get(1, 2), Some(&7));
        assert_eq!(grid.flat_index(1, 2), Some(5));
        assert_eq!(grid.row(1), Some(&[0, 0, 7][..]));
        assert_eq!(grid.row(2), None);
        assert!(Grid::from_data(2, 2, vec![1, 2, 3]).is_none());
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[[0,0,0],[0,0,7]]");
    }

    #[test]
    fn test_one_record_per_cell() {
        let table = RecordTable::from_records(vec![
            record(2.0, 20.0, Some(11.0)),
            record(1.0, 10.0, Some(5.0)),
            record(2.0, 10.0, Some(9.0)),
            record(1.0, 20.0, Some(7.0)),
        ]);
        let grid = build_grid(&table, "memory_size", "seed", "total_score").unwrap().unwrap();

        assert_eq!(grid.rows, vec![FieldValue::from(1.0), FieldValue::from(2.0)]);
        assert_eq!(grid.cols, vec![FieldValue::from(10.0), FieldValue::from(20.0)]);
        assert_eq!(
            grid.to_nested(),
            vec![vec![Some(5.0), Some(7.0)], vec![Some(9.0), Some(11.0)]]
        );
    }

    #[test]
    fn test_empty_cells_are_none_and_means_average() {
        let table = RecordTable::from_records(vec![
            record(1.0, 10.0, Some(4.0)),
            record(1.0, 10.0, Some(6.0)),
            record(2.0, 20.0, Some(1.0)),
            record(3.0, 30.0, None),
        ]);
        let grid = build_grid(&table, "memory_size", "seed", "total_score").unwrap().unwrap();

        // The record without a metric contributes no axis values
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.value(&FieldValue::from(1.0), &FieldValue::from(10.0)), Some(5.0));
        assert_eq!(grid.value(&FieldValue::from(1.0), &FieldValue::from(20.0)), None);
        assert_eq!(grid.counts.get(0, 0), Some(&2));
        assert_eq!(grid.counts.get(0, 1), Some(&0));
    }

    #[test]
    fn test_no_data_gives_none() {
        let table = RecordTable::from_records(vec![record(1.0, 10.0, None)]);
        assert!(build_grid(&table, "memory_size", "seed", "total_score").unwrap().is_none());
        assert!(build_grid(&table, "memory_size", "seed", "nope").unwrap().is_none());
    }

    #[test]
    fn test_unknown_axis_field() {
        let table = RecordTable::from_records(vec![record(1.0, 10.0, Some(1.0))]);
        assert_eq!(
            build_grid(&table, "memory_size", "nope", "total_score"),
            Err(StatsError::UnsupportedGroupField("nope".into()))
        );
    }

    #[test]
    fn test_faceted_grids() {
        let table = RecordTable::from_records(vec![
            record(1.0, 10.0, Some(1.0)).with("altruism_prob", 0.2),
            record(2.0, 10.0, Some(2.0)).with("altruism_prob", 0.2),
            record(1.0, 20.0, Some(3.0)).with("altruism_prob", 0.5),
            record(1.0, 20.0, None).with("altruism_prob", 0.8),
            record(1.0, 20.0, Some(9.0)),
        ]);
        let facets =
            build_faceted_grids(&table, "altruism_prob", "memory_size", "seed", "total_score").unwrap();

        assert_eq!(facets.len(), 2);
        let low = &facets[&FieldValue::from(0.2)];
        assert_eq!(low.cells.shape(), (2, 1));
        let high = &facets[&FieldValue::from(0.5)];
        assert_eq!(high.to_nested(), vec![vec![Some(3.0)]]);
    }
}
