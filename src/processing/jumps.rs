//! Jump (transition) detection from a rolling standard deviation.
//!
//! The rolling value at position `i` covers samples `[i - window + 1, i]`;
//! positions before `window - 1` have no value and never become candidates.
//! A position is a candidate when its rolling deviation is strictly above
//! the threshold. Candidates are then declustered: the first is kept, and a
//! later candidate is kept only when it lies more than `window` samples past
//! the last kept one, so a ramp collapses to the index where it starts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Estimator used for the rolling standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispersion {
    /// `n - 1` denominator. Undefined for a window of one sample.
    Sample,
    /// `n` denominator.
    #[default]
    Population,
}

impl Dispersion {
    fn ddof(self) -> usize {
        match self {
            Dispersion::Sample => 1,
            Dispersion::Population => 0,
        }
    }
}

/// Validated detector parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpDetector {
    window: usize,
    threshold: f64,
    dispersion: Dispersion,
}

impl JumpDetector {
    pub fn new(window: usize, threshold: f64) -> Result<Self, ConfigError> {
        if window < 1 {
            return Err(ConfigError::InvalidWindow(window as i64));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self {
            window,
            threshold,
            dispersion: Dispersion::default(),
        })
    }

    pub fn with_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.dispersion = dispersion;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Ascending transition indices, each in `[window - 1, N - 1]`.
    /// A series shorter than the window yields nothing.
    pub fn detect(&self, values: &[f64]) -> Vec<usize> {
        let candidates = rolling_std(values, self.window, self.dispersion)
            .into_iter()
            .enumerate()
            .filter_map(|(i, std)| match std {
                Some(s) if s > self.threshold => Some(i),
                _ => None,
            });
        decluster(candidates, self.window)
    }
}

/// Trailing-window standard deviation.
///
/// Entry `i` is `None` when fewer than `window` samples end at `i`, when the
/// window contains a non-finite sample, or when the estimator is undefined
/// (sample estimator over a single sample).
pub fn rolling_std(values: &[f64], window: usize, dispersion: Dispersion) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window == 0 || n < window || window <= dispersion.ddof() {
        return out;
    }

    let denom = (window - dispersion.ddof()) as f64;
    for end in (window - 1)..n {
        let slice = &values[end + 1 - window..=end];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        // Two-pass so that a flat window is exactly zero.
        let mean = slice.iter().sum::<f64>() / window as f64;
        let ss: f64 = slice.iter().map(|v| (v - mean) * (v - mean)).sum();
        out[end] = Some((ss / denom).sqrt());
    }
    out
}

/// Keep the first candidate, then any candidate more than `window` past the
/// last kept one.
pub fn decluster(candidates: impl IntoIterator<Item = usize>, window: usize) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    for idx in candidates {
        match kept.last() {
            Some(&last) if idx <= last + window => {}
            _ => kept.push(idx),
        }
    }
    kept
}
