use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A named column of samples. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How the index/time column is meant to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    #[default]
    Numeric,
    /// Unix timestamps in seconds.
    Timestamp,
}

/// The currently loaded table: every series has the same number of rows.
/// An optional index/time column is kept apart from the data series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesStore {
    series: BTreeMap<String, Series>,
    /// Column order as loaded.
    order: Vec<String>,
    index_column: Option<Series>,
    index_kind: IndexKind,
    rows: usize,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a series. The first series fixes the row count.
    pub fn set_series(&mut self, name: &str, values: Vec<f64>) -> Result<(), StoreError> {
        self.check_rows(name, values.len())?;
        if self.is_empty() {
            self.rows = values.len();
        }
        if !self.series.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.series.insert(name.to_string(), Series::new(name, values));
        Ok(())
    }

    /// Set the distinguished index/time column. Not required by any algorithm.
    pub fn set_index_column(
        &mut self,
        name: &str,
        values: Vec<f64>,
        kind: IndexKind,
    ) -> Result<(), StoreError> {
        self.check_rows(name, values.len())?;
        if self.is_empty() {
            self.rows = values.len();
        }
        self.index_column = Some(Series::new(name, values));
        self.index_kind = kind;
        Ok(())
    }

    fn check_rows(&self, name: &str, got: usize) -> Result<(), StoreError> {
        let has_rows = !self.series.is_empty() || self.index_column.is_some();
        if has_rows && got != self.rows {
            return Err(StoreError::LengthMismatch {
                name: name.to_string(),
                expected: self.rows,
                got,
            });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn values(&self, name: &str) -> Result<&[f64], StoreError> {
        self.get(name)
            .map(|s| s.values.as_slice())
            .ok_or_else(|| StoreError::UnknownSeries(name.to_string()))
    }

    pub fn index_column(&self) -> Option<&Series> {
        self.index_column.as_ref()
    }

    pub fn index_kind(&self) -> IndexKind {
        self.index_kind
    }

    /// Number of rows in the table.
    pub fn length(&self) -> usize {
        self.rows
    }

    /// Valid sample x-positions `0..N-1`, in order.
    pub fn sample_positions(&self) -> Vec<usize> {
        (0..self.rows).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.index_column.is_none()
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.order.clear();
        self.index_column = None;
        self.index_kind = IndexKind::default();
        self.rows = 0;
    }
}
