//! Pearson correlation matrix over numeric fields

use serde::Serialize;

use crate::grid::Grid;
use crate::table::RecordTable;

/// Symmetric correlation matrix indexed by `fields` on both axes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<String>,
    /// `None` where fewer than two paired observations exist or a side has
    /// zero variance
    pub values: Grid<Option<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two fields by name
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.fields.iter().position(|f| f == a)?;
        let j = self.fields.iter().position(|f| f == b)?;
        self.values.get(i, j).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Pearson correlation over the pairs where both sides are present
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let (dx, dy) = (a - mean_x, b - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlate every pair of the requested fields (all fields when `fields` is
/// `None`).
///
/// Requested fields missing from the table are dropped with a warning. Each
/// value is coerced to a number on its own: numeric text counts, anything
/// unparsable is excluded per pair like a missing value. Fields with no
/// numeric value at all are left out.
pub fn correlation_matrix<S: AsRef<str>>(table: &RecordTable, fields: Option<&[S]>) -> CorrelationMatrix {
    let requested = match fields {
        Some(fields) => table.resolve_fields(fields).present,
        None => table.schema().to_vec(),
    };

    let (fields, columns): (Vec<String>, Vec<Vec<Option<f64>>>) = requested
        .into_iter()
        .map(|field| {
            let column: Vec<Option<f64>> = table.column(&field).map(|v| v.to_numeric().as_f64()).collect();
            (field, column)
        })
        .filter(|(_, column)| column.iter().any(Option::is_some))
        .unzip();

    let k = fields.len();
    let mut values = Grid::new(k, k, None);
    for i in 0..k {
        for j in i..k {
            let r = pearson(&columns[i], &columns[j]);
            values.set(i, j, r);
            values.set(j, i, r);
        }
    }

    tracing::debug!(fields = k, "computed correlation matrix");
    CorrelationMatrix { fields, values }
}
