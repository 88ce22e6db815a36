use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Marker returned by [`detect_date_format`] for RFC 3339 timestamps
/// (e.g. `2024-03-01T08:00:00.250Z`).
pub const RFC3339_FORMAT: &str = "__rfc3339__";

/// Formats tried when recognising a time column, most specific first.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
];

/// Share of non-empty cells that must parse before a column counts as time.
const MIN_PARSE_FRACTION: f64 = 0.7;

/// Pick the format that parses the largest share of the first 100
/// non-empty cells. `None` if nothing parses.
pub fn detect_date_format(values: &[String]) -> Option<&'static str> {
    let sample: Vec<&str> = values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(100)
        .collect();
    if sample.is_empty() {
        return None;
    }

    let score = |fmt: &str| {
        sample.iter().filter(|s| parse_to_timestamp(s, fmt).is_some()).count() as f64
            / sample.len() as f64
    };

    let mut best: Option<(&'static str, f64)> = None;
    for fmt in std::iter::once(RFC3339_FORMAT).chain(DATE_FORMATS.iter().copied()) {
        let s = score(fmt);
        if s > 0.0 && best.map_or(true, |(_, b)| s > b) {
            best = Some((fmt, s));
        }
    }
    best.map(|(fmt, _)| fmt)
}

/// Parse one cell to a Unix timestamp in seconds, keeping milliseconds.
pub fn parse_to_timestamp(value: &str, format: &str) -> Option<f64> {
    if format == RFC3339_FORMAT {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.timestamp_millis() as f64 / 1000.0);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
        return Some(dt.and_utc().timestamp_millis() as f64 / 1000.0);
    }
    let date = NaiveDate::parse_from_str(value, format).ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64)
}

/// Parse a whole column if it looks like timestamps. Unparseable cells
/// become NaN.
pub fn column_to_timestamps(data: &[String]) -> Option<Vec<f64>> {
    let format = detect_date_format(data)?;
    let mut valid = 0usize;
    let non_empty = data.iter().filter(|s| !s.trim().is_empty()).count();
    let stamps: Vec<f64> = data
        .iter()
        .map(|s| match parse_to_timestamp(s.trim(), format) {
            Some(ts) => {
                valid += 1;
                ts
            }
            None => f64::NAN,
        })
        .collect();
    if non_empty == 0 || (valid as f64 / non_empty as f64) < MIN_PARSE_FRACTION {
        return None;
    }
    Some(stamps)
}

/// Whether a single header-candidate cell is a date rather than a label.
pub fn is_date_like(cell: &str) -> bool {
    let cell = cell.trim();
    if !(cell.contains('/') || cell.contains(':') || cell.contains('-')) {
        return false;
    }
    std::iter::once(RFC3339_FORMAT)
        .chain(DATE_FORMATS.iter().copied())
        .any(|fmt| parse_to_timestamp(cell, fmt).is_some())
}

/// Render a timestamp for report tables; milliseconds only when present.
pub fn format_timestamp(ts: f64) -> String {
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1_000_000_000.0).round() as u32;
    match DateTime::<Utc>::from_timestamp(secs, nanos.min(999_999_999)) {
        Some(dt) if nanos == 0 => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => format!("{ts:.3}"),
    }
}
