use std::collections::HashMap;

use serde::Serialize;

use crate::error::StatsError;
use crate::processing::partition::StableInterval;

/// Largest and smallest finite sample of an interval, with absolute indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extrema {
    pub max: f64,
    pub max_index: usize,
    pub min: f64,
    pub min_index: usize,
}

/// Full-precision statistics of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalStats {
    pub mean: f64,
    #[serde(flatten)]
    pub extrema: Extrema,
}

/// Finite samples of `interval` paired with their absolute index.
fn finite_samples(
    values: &[f64],
    interval: StableInterval,
) -> Result<impl Iterator<Item = (usize, f64)> + '_, StatsError> {
    let no_data = StatsError::NoData {
        start: interval.start,
        end: interval.end,
    };
    if interval.is_empty() || interval.end >= values.len() {
        return Err(no_data);
    }
    let slice = &values[interval.start..=interval.end];
    if !slice.iter().any(|v| v.is_finite()) {
        return Err(no_data);
    }
    Ok(slice
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(move |(offset, &v)| (interval.start + offset, v)))
}

/// Arithmetic mean of the finite samples in `interval`.
pub fn mean_of(values: &[f64], interval: StableInterval) -> Result<f64, StatsError> {
    let (sum, count) = finite_samples(values, interval)?
        .fold((0.0, 0usize), |(sum, count), (_, v)| (sum + v, count + 1));
    Ok(sum / count as f64)
}

/// Max and min of `interval`. Ties keep the leftmost index.
pub fn extrema_of(values: &[f64], interval: StableInterval) -> Result<Extrema, StatsError> {
    let mut samples = finite_samples(values, interval)?;
    let Some((first_index, first)) = samples.next() else {
        return Err(StatsError::NoData {
            start: interval.start,
            end: interval.end,
        });
    };
    let mut ext = Extrema {
        max: first,
        max_index: first_index,
        min: first,
        min_index: first_index,
    };
    for (i, v) in samples {
        if v > ext.max {
            ext.max = v;
            ext.max_index = i;
        }
        if v < ext.min {
            ext.min = v;
            ext.min_index = i;
        }
    }
    Ok(ext)
}

pub fn interval_stats(values: &[f64], interval: StableInterval) -> Result<IntervalStats, StatsError> {
    Ok(IntervalStats {
        mean: mean_of(values, interval)?,
        extrema: extrema_of(values, interval)?,
    })
}

/// Slope between samples `i1` and `i2` when consecutive samples are
/// `delta_t` apart. Coincident x positions give `f64::INFINITY`.
pub fn slope_between(values: &[f64], i1: usize, i2: usize, delta_t: f64) -> Option<f64> {
    let (y1, y2) = (*values.get(i1)?, *values.get(i2)?);
    let (x1, x2) = (i1 as f64 * delta_t, i2 as f64 * delta_t);
    if x1 == x2 {
        return Some(f64::INFINITY);
    }
    Some((y2 - y1) / (x2 - x1))
}

/// Round toward negative infinity at `precision` decimals. Display only.
pub fn floor_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(precision as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.floor() / scale
}

/// `floor_to` rendered with exactly `precision` decimals.
pub fn format_floored(value: f64, precision: u32) -> String {
    let p = precision as usize;
    format!("{:.p$}", floor_to(value, precision))
}

/// One row of a [`SeriesRecord`]. `stats` is `None` where the interval has
/// no data; consumers show it as a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRecord {
    pub interval: StableInterval,
    pub stats: Option<IntervalStats>,
}

/// Statistics of one series over an interval list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRecord {
    /// Series whose intervals were used. Equal to the record's own key
    /// unless the series follows another one.
    pub interval_source: String,
    pub rows: Vec<IntervalRecord>,
}

impl SeriesRecord {
    pub fn means(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.stats.map(|s| s.mean)).collect()
    }

    pub fn extrema(&self) -> Vec<Option<Extrema>> {
        self.rows.iter().map(|r| r.stats.map(|s| s.extrema)).collect()
    }
}

/// Per-series statistics records, rebuilt whenever intervals change.
#[derive(Debug, Default)]
pub struct StatisticsEngine {
    records: HashMap<String, SeriesRecord>,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute `name`'s record from `values` over `intervals`. An empty
    /// interval list means the whole series.
    pub fn recompute(
        &mut self,
        name: &str,
        values: &[f64],
        interval_source: &str,
        intervals: &[StableInterval],
    ) -> &SeriesRecord {
        let whole;
        let intervals = if intervals.is_empty() && !values.is_empty() {
            whole = [StableInterval::new(0, values.len() - 1)];
            &whole[..]
        } else {
            intervals
        };

        let rows: Vec<IntervalRecord> = intervals
            .iter()
            .map(|&interval| {
                let stats = match interval_stats(values, interval) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        tracing::debug!(series = name, "{e}");
                        None
                    }
                };
                IntervalRecord { interval, stats }
            })
            .collect();

        tracing::debug!(series = name, source = interval_source, rows = rows.len(), "statistics recomputed");
        self.records.insert(
            name.to_string(),
            SeriesRecord {
                interval_source: interval_source.to_string(),
                rows,
            },
        );
        &self.records[name]
    }

    pub fn record(&self, name: &str) -> Option<&SeriesRecord> {
        self.records.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<SeriesRecord> {
        self.records.remove(name)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> StableInterval {
        StableInterval::new(start, end)
    }

    #[test]
    fn test_mean_whole_series() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(mean_of(&values, iv(0, 99)).unwrap(), 49.5);
    }

    #[test]
    fn test_extrema_absolute_indices() {
        let values = [5.0, 1.0, 9.0, 3.0, 7.0, 0.5];
        let ext = extrema_of(&values, iv(2, 4)).unwrap();
        assert_eq!(ext.max, 9.0);
        assert_eq!(ext.max_index, 2);
        assert_eq!(ext.min, 3.0);
        assert_eq!(ext.min_index, 3);
    }

    #[test]
    fn test_ties_resolve_to_first_index() {
        let values = [2.0, 8.0, 1.0, 8.0, 1.0];
        let ext = extrema_of(&values, iv(0, 4)).unwrap();
        assert_eq!(ext.max_index, 1);
        assert_eq!(ext.min_index, 2);
    }

    #[test]
    fn test_non_finite_samples_are_skipped() {
        let values = [f64::NAN, 4.0, f64::NAN, 2.0];
        assert_eq!(mean_of(&values, iv(0, 3)).unwrap(), 3.0);
        let ext = extrema_of(&values, iv(0, 3)).unwrap();
        assert_eq!((ext.max_index, ext.min_index), (1, 3));
    }

    #[test]
    fn test_no_data() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(mean_of(&[], iv(0, 0)), Err(StatsError::NoData { start: 0, end: 0 }));
        assert!(extrema_of(&values, iv(2, 5)).is_err());
        assert!(extrema_of(&[f64::NAN, f64::NAN], iv(0, 1)).is_err());
    }

    #[test]
    fn test_floor_rounding() {
        assert_eq!(floor_to(1.23456, 2), 1.23);
        assert_eq!(floor_to(-1.231, 2), -1.24);
        assert_eq!(floor_to(7.0, 0), 7.0);
        assert_eq!(format_floored(2.999, 2), "2.99");
        assert_eq!(format_floored(3.0, 3), "3.000");
        assert!(floor_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_slope_between() {
        let values = [0.0, 2.0, 4.0, 10.0];
        assert_eq!(slope_between(&values, 0, 2, 0.5), Some(4.0));
        assert_eq!(slope_between(&values, 1, 1, 1.0), Some(f64::INFINITY));
        assert_eq!(slope_between(&values, 0, 9, 1.0), None);
    }

    #[test]
    fn test_engine_whole_series_fallback() {
        let mut engine = StatisticsEngine::new();
        let values = [1.0, 2.0, 3.0, 4.0];
        let record = engine.recompute("p", &values, "p", &[]);
        assert_eq!(record.rows.len(), 1);
        assert_eq!(record.rows[0].interval, iv(0, 3));
        assert_eq!(record.means(), vec![Some(2.5)]);
    }

    #[test]
    fn test_engine_records_gap_for_empty_series() {
        let mut engine = StatisticsEngine::new();
        let record = engine.recompute("p", &[], "p", &[iv(0, 0)]);
        assert_eq!(record.rows[0].stats, None);
        assert!(engine.record("p").is_some());
        engine.remove("p");
        assert!(engine.record("p").is_none());
    }
}
