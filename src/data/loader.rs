use std::path::Path;

use crate::data::datetime::column_to_timestamps;
use crate::data::parser::{clean_column_name, detect_header_row};
use crate::error::LoadError;
use crate::state::series_store::{IndexKind, SeriesStore};

/// Rows scanned when looking for the header.
const HEADER_SCAN_LINES: usize = 50;

/// Result of loading a data file: column names and column data as strings.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub columns: Vec<String>,
    /// Column-major: `column_data[col][row]`.
    pub column_data: Vec<Vec<String>>,
    pub row_count: usize,
}

/// Load a CSV file. Other formats are rejected.
pub fn load_file(path: &Path) -> Result<LoadedData, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        _ => Err(LoadError::UnsupportedFormat(ext)),
    }
}

fn load_csv(path: &Path) -> Result<LoadedData, LoadError> {
    let content = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data = parse_csv(&content)?;
    tracing::info!(
        "Loaded {:?}: {} columns, {} rows",
        path,
        data.columns.len(),
        data.row_count
    );
    Ok(data)
}

/// Parse CSV bytes. Non-UTF-8 input is read as Latin-1.
pub fn parse_csv(content: &[u8]) -> Result<LoadedData, LoadError> {
    let text = match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(_) => content.iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Blank or all-empty lines carry no samples.
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        all_rows.push(record.iter().map(str::to_string).collect());
    }

    let header_row = detect_header_row(&all_rows, HEADER_SCAN_LINES).ok_or(LoadError::NoData)?;
    let columns: Vec<String> = all_rows[header_row]
        .iter()
        .map(|s| clean_column_name(s))
        .collect();

    let data_rows = &all_rows[header_row + 1..];
    let mut column_data: Vec<Vec<String>> = vec![Vec::with_capacity(data_rows.len()); columns.len()];
    for row in data_rows {
        for (col_idx, col) in column_data.iter_mut().enumerate() {
            col.push(row.get(col_idx).cloned().unwrap_or_default());
        }
    }

    Ok(LoadedData {
        columns,
        column_data,
        row_count: data_rows.len(),
    })
}

/// Numeric values of a column, or `None` if any non-empty cell is not a
/// number. Empty cells become NaN.
pub fn column_to_f64(data: &[String]) -> Option<Vec<f64>> {
    let mut any_number = false;
    let mut values = Vec::with_capacity(data.len());
    for cell in data {
        let cell = cell.trim();
        if cell.is_empty() {
            values.push(f64::NAN);
            continue;
        }
        values.push(cell.parse::<f64>().ok()?);
        any_number = true;
    }
    any_number.then_some(values)
}

fn looks_like_time_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("time") || lower == "t" || lower.starts_with("t [")
}

impl LoadedData {
    /// Build the table view used by the analysis core.
    ///
    /// Numeric columns become series. The first date/time text column, or
    /// else the first numeric column named like a time axis, becomes the
    /// index column; a numeric time column stays available as a series too.
    pub fn into_store(self) -> Result<SeriesStore, LoadError> {
        let mut store = SeriesStore::new();
        let mut numeric_time: Option<(String, Vec<f64>)> = None;
        let mut timestamp_index: Option<(String, Vec<f64>)> = None;

        for (name, cells) in self.columns.iter().zip(&self.column_data) {
            if name.is_empty() {
                continue;
            }
            if let Some(values) = column_to_f64(cells) {
                if numeric_time.is_none() && looks_like_time_name(name) {
                    numeric_time = Some((name.clone(), values.clone()));
                }
                store.set_series(name, values).map_err(|e| {
                    tracing::warn!("{e}");
                    LoadError::NoData
                })?;
            } else if timestamp_index.is_none() {
                if let Some(stamps) = column_to_timestamps(cells) {
                    timestamp_index = Some((name.clone(), stamps));
                }
            }
        }

        if store.is_empty() {
            return Err(LoadError::NoNumericColumns);
        }

        let index = match (timestamp_index, numeric_time) {
            (Some((name, values)), _) => Some((name, values, IndexKind::Timestamp)),
            (None, Some((name, values))) => Some((name, values, IndexKind::Numeric)),
            (None, None) => None,
        };
        if let Some((name, values, kind)) = index {
            tracing::debug!(column = %name, ?kind, "index column");
            store
                .set_index_column(&name, values, kind)
                .map_err(|_| LoadError::NoData)?;
        }
        Ok(store)
    }
}
