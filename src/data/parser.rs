use std::collections::HashMap;

use crate::data::datetime::is_date_like;

/// Characters in column names that downstream consumers cannot display.
const NAME_REPLACEMENTS: &[(&str, &str)] = &[("λ", "_lambda_"), ("Σ", "_sigma_")];

/// Index of the header row among the first `max_lines` rows.
///
/// Test-rig logs often carry a preamble before the real table. The header
/// is the last row (scanning upwards) that has the most common column count
/// and consists only of non-numeric, non-date labels. Falls back to row 0.
pub fn detect_header_row(rows: &[Vec<String>], max_lines: usize) -> Option<usize> {
    let head = &rows[..rows.len().min(max_lines)];
    if head.is_empty() {
        return None;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in head {
        *counts.entry(row.len()).or_insert(0) += 1;
    }
    // Ties on frequency prefer the wider row.
    let modal = counts
        .into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)?;

    let is_label = |cell: &String| {
        let cell = cell.trim();
        !cell.is_empty() && cell.parse::<f64>().is_err() && !is_date_like(cell)
    };

    let header = head
        .iter()
        .enumerate()
        .rev()
        .find(|(_, row)| row.len() == modal && row.iter().all(|c| is_label(c)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(header)
}

/// Trim a header cell and replace symbols listed in `NAME_REPLACEMENTS`.
pub fn clean_column_name(raw: &str) -> String {
    NAME_REPLACEMENTS
        .iter()
        .fold(raw.trim().to_string(), |name, (from, to)| name.replace(from, to))
}
