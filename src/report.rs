//! Report rows: the statistics table as shown to the analyst.
//!
//! Numbers are floored to the configured precision here and nowhere else;
//! intervals without data become empty cells.

use std::io::Write;

use serde::Serialize;

use crate::data::datetime::format_timestamp;
use crate::processing::statistics::{format_floored, SeriesRecord};
use crate::state::series_store::{IndexKind, Series};

pub const COLUMNS: [&str; 7] = [
    "Interval",
    "Time",
    "Mean",
    "Max index",
    "Max",
    "Min index",
    "Min",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub interval: String,
    pub time_range: String,
    pub mean: String,
    pub max_index: String,
    pub max: String,
    pub min_index: String,
    pub min: String,
}

impl ReportRow {
    fn cells(&self) -> [&str; 7] {
        [
            self.interval.as_str(),
            self.time_range.as_str(),
            self.mean.as_str(),
            self.max_index.as_str(),
            self.max.as_str(),
            self.min_index.as_str(),
            self.min.as_str(),
        ]
    }
}

fn format_index_value(value: f64, kind: IndexKind) -> String {
    if !value.is_finite() {
        return String::new();
    }
    match kind {
        IndexKind::Timestamp => format_timestamp(value),
        IndexKind::Numeric => format!("{value}"),
    }
}

/// One row per interval of `record`.
pub fn build_rows(
    record: &SeriesRecord,
    index: Option<(&Series, IndexKind)>,
    precision: u32,
) -> Vec<ReportRow> {
    record
        .rows
        .iter()
        .map(|row| {
            let time_range = index
                .and_then(|(series, kind)| {
                    let start = series.values.get(row.interval.start)?;
                    let end = series.values.get(row.interval.end)?;
                    Some(format!(
                        "{} - {}",
                        format_index_value(*start, kind),
                        format_index_value(*end, kind)
                    ))
                })
                .unwrap_or_default();

            let num = |v: f64| format_floored(v, precision);
            match row.stats {
                Some(stats) => ReportRow {
                    interval: row.interval.label(),
                    time_range,
                    mean: num(stats.mean),
                    max_index: stats.extrema.max_index.to_string(),
                    max: num(stats.extrema.max),
                    min_index: stats.extrema.min_index.to_string(),
                    min: num(stats.extrema.min),
                },
                None => ReportRow {
                    interval: row.interval.label(),
                    time_range,
                    mean: String::new(),
                    max_index: String::new(),
                    max: String::new(),
                    min_index: String::new(),
                    min: String::new(),
                },
            }
        })
        .collect()
}

pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.write_record(row.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Rows of several series in one table, led by a `Series` column.
pub fn write_csv_by_series<W: Write>(
    reports: &[(&str, Vec<ReportRow>)],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(std::iter::once("Series").chain(COLUMNS))?;
    for (series, rows) in reports {
        for row in rows {
            wtr.write_record(std::iter::once(*series).chain(row.cells()))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Report<'a> {
    series: &'a str,
    rows: &'a [ReportRow],
}

pub fn to_json(series: &str, rows: &[ReportRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Report { series, rows })
}

/// One JSON array with a `{series, rows}` object per series.
pub fn to_json_all(reports: &[(&str, Vec<ReportRow>)]) -> serde_json::Result<String> {
    let all: Vec<Report<'_>> = reports
        .iter()
        .map(|(series, rows)| Report { series, rows })
        .collect();
    serde_json::to_string_pretty(&all)
}

/// Plain-text table with aligned columns.
pub fn render_table(series: &str, rows: &[ReportRow]) -> String {
    let mut widths = COLUMNS.map(str::len);
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.cells()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 7]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = format!("{series}:\n");
    out.push_str(&line(COLUMNS));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.cells()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::partition::StableInterval;
    use crate::processing::statistics::{Extrema, IntervalRecord, IntervalStats};

    fn record() -> SeriesRecord {
        SeriesRecord {
            interval_source: "p".into(),
            rows: vec![
                IntervalRecord {
                    interval: StableInterval::new(0, 2),
                    stats: Some(IntervalStats {
                        mean: 1.23456,
                        extrema: Extrema {
                            max: 2.9999,
                            max_index: 1,
                            min: -0.5,
                            min_index: 2,
                        },
                    }),
                },
                IntervalRecord {
                    interval: StableInterval::new(5, 6),
                    stats: None,
                },
            ],
        }
    }

    #[test]
    fn test_rows_are_floored_and_gaps_are_blank() {
        let time = Series::new("Time [s]", vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2]);
        let rows = build_rows(&record(), Some((&time, IndexKind::Numeric)), 2);
        assert_eq!(rows[0].interval, "0 - 2");
        assert_eq!(rows[0].time_range, "0 - 0.4");
        assert_eq!(rows[0].mean, "1.23");
        assert_eq!(rows[0].max, "2.99");
        assert_eq!(rows[0].min, "-0.50");
        assert_eq!(rows[0].max_index, "1");
        assert_eq!(rows[1].mean, "");
        assert_eq!(rows[1].time_range, "1 - 1.2");
    }

    #[test]
    fn test_without_index_column() {
        let rows = build_rows(&record(), None, 0);
        assert_eq!(rows[0].time_range, "");
        assert_eq!(rows[0].mean, "1");
    }

    #[test]
    fn test_csv_export() {
        let rows = build_rows(&record(), None, 1);
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Interval,Time,Mean,Max index,Max,Min index,Min"));
        assert_eq!(lines.next(), Some("0 - 2,,1.2,1,2.9,2,-0.5"));
        assert_eq!(lines.next(), Some("5 - 6,,,,,,"));
    }

    #[test]
    fn test_json_and_table() {
        let rows = build_rows(&record(), None, 3);
        let json = to_json("p", &rows).unwrap();
        assert!(json.contains("\"series\": \"p\""));
        assert!(json.contains("\"mean\": \"1.234\""));
        let table = render_table("p", &rows);
        assert!(table.starts_with("p:\nInterval"));
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn test_followers_share_one_csv() {
        let rows = build_rows(&record(), None, 1);
        let reports = [("p", rows.clone()), ("q", rows)];
        let mut buf = Vec::new();
        write_csv_by_series(&reports, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Series,Interval,Time,Mean,Max index,Max,Min index,Min");
        assert_eq!(lines[1], "p,0 - 2,,1.2,1,2.9,2,-0.5");
        assert_eq!(lines[4], "q,5 - 6,,,,,,");
    }

    #[test]
    fn test_followers_share_one_json_document() {
        let rows = build_rows(&record(), None, 3);
        let reports = [("p", rows.clone()), ("q", rows)];
        let json = to_json_all(&reports).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let all = parsed.as_array().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1]["series"], "q");
        assert_eq!(all[0]["rows"][0]["mean"], "1.234");
    }
}
