//! Conversion of transition indices into stable intervals.

use serde::{Deserialize, Serialize};

/// Inclusive sample range `[start, end]` treated as one statistical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableInterval {
    pub start: usize,
    pub end: usize,
}

impl StableInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    /// Label used in report tables, e.g. `"0 - 17"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }
}

impl From<(usize, usize)> for StableInterval {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

/// Samples excluded before (`left`) and after (`right`) each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneWidths {
    pub left: usize,
    pub right: usize,
}

impl ZoneWidths {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }
}

/// Split `[0, len - 1]` into stable intervals around `transitions`.
///
/// Transitions need not be sorted or unique; indices `>= len` are ignored.
/// With no transitions the whole series is one interval. An empty series
/// yields no intervals. Between two transitions `a < b` an interval
/// `[a + right, b - left]` exists only when it has positive width. The outer
/// bounds saturate at the series edges: the first interval ends no earlier
/// than `0`, the last starts no later than `len - 1`.
pub fn partition(transitions: &[usize], zones: ZoneWidths, len: usize) -> Vec<StableInterval> {
    if len == 0 {
        return Vec::new();
    }
    let last_index = len - 1;

    let mut sorted: Vec<usize> = transitions.iter().copied().filter(|&t| t < len).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return vec![StableInterval::new(0, last_index)];
    };

    let mut intervals = Vec::with_capacity(sorted.len() + 1);
    intervals.push(StableInterval::new(0, first.saturating_sub(zones.left)));

    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let start = a.saturating_add(zones.right);
        if b >= zones.left && start < b - zones.left {
            intervals.push(StableInterval::new(start, b - zones.left));
        }
    }

    // Clamping the transition to `len - right - 1` puts the start on the
    // last sample at most.
    let start = last.saturating_add(zones.right).min(last_index);
    intervals.push(StableInterval::new(start, last_index));

    intervals
}
