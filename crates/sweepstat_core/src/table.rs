//! Materialized table of normalized records
//!
//! [`RecordTable`] is the one tabular backend every aggregation consumes.
//! Building it fixes the schema: the union of fields across all records,
//! with each record padded to carry every field (missing ones as `Null`).

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::{Result, StatsError};
use crate::model::{FieldSource, FieldValue, GroupKey};
use crate::normalize::{NormalizedRecord, results_to_records, schema_rank};

/// Observed value kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Every value is null
    Empty,
    Numeric,
    Text,
    /// Both numbers and text
    Mixed,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Empty => "empty",
            FieldKind::Numeric => "numeric",
            FieldKind::Text => "text",
            FieldKind::Mixed => "mixed",
        }
    }
}

/// Outcome of resolving requested field names against the schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldResolution {
    /// Requested fields that exist, in request order
    pub present: Vec<String>,
    /// Requested fields that do not exist, sorted
    pub missing: Vec<String>,
}

/// Normalized records with a stable schema
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordTable {
    schema: Vec<String>,
    records: Vec<NormalizedRecord>,
}

impl RecordTable {
    /// Build a table, padding every record to the full schema.
    pub fn from_records(mut records: Vec<NormalizedRecord>) -> Self {
        let mut schema: Vec<String> = Vec::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for record in &records {
            for (field, _) in record.iter() {
                if seen.insert(field) {
                    schema.push(field.to_string());
                }
            }
        }
        schema.sort_by(|a, b| schema_rank(a).cmp(&schema_rank(b)).then_with(|| a.cmp(b)));

        for record in &mut records {
            for field in &schema {
                record.fill_missing(field);
            }
        }

        tracing::debug!(rows = records.len(), columns = schema.len(), "built record table");
        Self { schema, records }
    }

    /// Normalize `results` and build a table from them
    pub fn from_results<S: FieldSource>(results: &[S]) -> Self {
        Self::from_records(results_to_records(results))
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.schema.iter().any(|f| f == field)
    }

    /// Split requested fields into present and missing ones, warning about
    /// the missing ones.
    pub fn resolve_fields<S: AsRef<str>>(&self, requested: &[S]) -> FieldResolution {
        let mut resolution = FieldResolution::default();
        for field in requested {
            let field = field.as_ref();
            if self.has_field(field) {
                if !resolution.present.iter().any(|f| f == field) {
                    resolution.present.push(field.to_string());
                }
            } else if !resolution.missing.iter().any(|f| f == field) {
                resolution.missing.push(field.to_string());
            }
        }
        resolution.missing.sort();
        if !resolution.missing.is_empty() {
            tracing::warn!(missing = ?resolution.missing, "fields not found in records");
        }
        resolution
    }

    /// Whether `metric` exists, warning when it does not
    pub(crate) fn resolve_metric(&self, metric: &str) -> bool {
        self.resolve_fields(&[metric]).missing.is_empty()
    }

    /// Fail with [`StatsError::UnsupportedGroupField`] for the first grouping
    /// field missing from the schema.
    pub fn require_group_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<()> {
        if fields.is_empty() {
            return Err(StatsError::EmptyGrouping);
        }
        match fields.iter().find(|f| !self.has_field(f.as_ref())) {
            Some(field) => Err(StatsError::UnsupportedGroupField(field.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Values of `field` across all records
    pub fn column<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.records.iter().map(move |r| r.get(field))
    }

    /// Replace parseable text with numbers and anything else non-numeric with
    /// `Null` in the given fields. Fields absent from the schema are ignored.
    pub fn coerce_numeric<S: AsRef<str>>(&mut self, fields: &[S]) {
        for field in fields {
            let field = field.as_ref();
            if !self.has_field(field) {
                continue;
            }
            for record in &mut self.records {
                if let Some(value) = record.get_mut(field) {
                    *value = value.to_numeric();
                }
            }
        }
    }

    /// Kind of `field` judged from its non-null values
    pub fn field_kind(&self, field: &str) -> FieldKind {
        let mut numeric = false;
        let mut text = false;
        for value in self.column(field) {
            match value {
                FieldValue::Number(_) => numeric = true,
                FieldValue::Text(_) => text = true,
                FieldValue::Null => {}
            }
        }
        match (numeric, text) {
            (false, false) => FieldKind::Empty,
            (true, false) => FieldKind::Numeric,
            (false, true) => FieldKind::Text,
            (true, true) => FieldKind::Mixed,
        }
    }

    /// Kind of every column, in schema order
    pub fn field_kinds(&self) -> Vec<(String, FieldKind)> {
        self.schema
            .iter()
            .map(|field| (field.clone(), self.field_kind(field)))
            .collect()
    }

    /// Indices of records grouped by the values of `fields`, ascending by key.
    ///
    /// Records with a null in any grouping field belong to no group.
    pub(crate) fn group_indices<S: AsRef<str>>(&self, fields: &[S]) -> Vec<(GroupKey, Vec<usize>)> {
        self.group_indices_of(0..self.records.len(), fields)
    }

    /// As [`Self::group_indices`], restricted to the records at `indices`.
    pub(crate) fn group_indices_of<S: AsRef<str>>(
        &self,
        indices: impl IntoIterator<Item = usize>,
        fields: &[S],
    ) -> Vec<(GroupKey, Vec<usize>)> {
        let mut groups: FxHashMap<GroupKey, Vec<usize>> = FxHashMap::default();
        'records: for i in indices {
            let record = &self.records[i];
            let mut key = Vec::with_capacity(fields.len());
            for field in fields {
                let value = record.get(field.as_ref());
                if value.is_null() {
                    continue 'records;
                }
                key.push(value.clone());
            }
            groups.entry(GroupKey(key)).or_default().push(i);
        }
        let mut groups: Vec<_> = groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }

    /// Non-null numeric values of `field` for the records at `indices`
    pub(crate) fn numbers_at(&self, indices: &[usize], field: &str) -> Vec<f64> {
        indices
            .iter()
            .filter_map(|&i| self.records[i].number(field))
            .collect()
    }
}

impl From<Vec<NormalizedRecord>> for RecordTable {
    fn from(records: Vec<NormalizedRecord>) -> Self {
        Self::from_records(records)
    }
}
