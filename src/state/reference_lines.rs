//! Interactive reference-line (transition) editing for one series.
//!
//! Every accepted mutation recomputes the stable intervals and publishes an
//! [`IntervalUpdate`] to all subscribers. Edits that leave the transition
//! set and zone widths as they were publish nothing, so a drag that keeps
//! reporting the same position does not cause redraws.

use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::processing::partition::{partition, StableInterval, ZoneWidths};

/// `Empty` when no transitions exist; statistics then cover the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Empty,
    Active,
}

/// Local result of a gesture. `Rejected` means the request referenced
/// something outside the series and nothing changed.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Unchanged,
    Rejected,
}

impl EditOutcome {
    pub fn is_applied(self) -> bool {
        self == EditOutcome::Applied
    }
}

/// What happened to the transition set, for consumers that draw one line
/// per transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionChange {
    Added(Vec<usize>),
    Removed(Vec<usize>),
    Moved { from: usize, to: usize },
    Replaced,
    Cleared,
    /// Zone widths changed, transitions did not.
    Zones,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalUpdate {
    pub series: String,
    pub intervals: Vec<StableInterval>,
    pub change: TransitionChange,
}

/// A reference line picked for dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub index: usize,
    /// Unsnapped pointer position, for drawing only.
    pub preview: f64,
}

pub struct ReferenceLineController {
    series: String,
    len: usize,
    transitions: BTreeSet<usize>,
    zones: ZoneWidths,
    intervals: Vec<StableInterval>,
    drag: Option<DragState>,
    subscribers: Vec<Sender<IntervalUpdate>>,
}

impl ReferenceLineController {
    /// Controller for `series` of `len` samples, starting `Empty`.
    pub fn new(series: impl Into<String>, len: usize, zones: ZoneWidths) -> Self {
        Self {
            series: series.into(),
            len,
            transitions: BTreeSet::new(),
            zones,
            intervals: partition(&[], zones, len),
            drag: None,
            subscribers: Vec::new(),
        }
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn series_len(&self) -> usize {
        self.len
    }

    pub fn state(&self) -> LineState {
        if self.transitions.is_empty() {
            LineState::Empty
        } else {
            LineState::Active
        }
    }

    /// Transitions in ascending order.
    pub fn transitions(&self) -> Vec<usize> {
        self.transitions.iter().copied().collect()
    }

    pub fn intervals(&self) -> &[StableInterval] {
        &self.intervals
    }

    pub fn zones(&self) -> ZoneWidths {
        self.zones
    }

    pub fn drag(&self) -> Option<DragState> {
        self.drag
    }

    /// New receiver for interval updates.
    pub fn subscribe(&mut self) -> Receiver<IntervalUpdate> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Publish to an existing channel, e.g. one shared by several controllers.
    pub fn add_subscriber(&mut self, tx: Sender<IntervalUpdate>) {
        self.subscribers.push(tx);
    }

    fn in_range(&self, index: usize) -> bool {
        index < self.len
    }

    fn reject(&self, what: &str, index: usize) -> EditOutcome {
        tracing::warn!(
            series = %self.series,
            index,
            len = self.len,
            "{what}: index outside series, ignored"
        );
        EditOutcome::Rejected
    }

    /// Recompute intervals and notify. Only called after a real change.
    fn commit(&mut self, change: TransitionChange) -> EditOutcome {
        let sorted = self.transitions();
        self.intervals = partition(&sorted, self.zones, self.len);
        tracing::debug!(
            series = %self.series,
            transitions = sorted.len(),
            intervals = self.intervals.len(),
            ?change,
            "stable intervals recomputed"
        );
        let update = IntervalUpdate {
            series: self.series.clone(),
            intervals: self.intervals.clone(),
            change,
        };
        // Drop subscribers whose receiver is gone.
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
        EditOutcome::Applied
    }

    /// Bulk replace. Afterwards the set equals `indices`. A growing update
    /// that keeps every existing index is reported as an addition of the new
    /// indices only; any other difference is reported as a replacement.
    pub fn set_all(&mut self, indices: &[usize]) -> EditOutcome {
        if let Some(&bad) = indices.iter().find(|&&i| !self.in_range(i)) {
            return self.reject("set_all", bad);
        }
        let next: BTreeSet<usize> = indices.iter().copied().collect();
        if next == self.transitions {
            return EditOutcome::Unchanged;
        }

        let change = if next.len() > self.transitions.len() && self.transitions.is_subset(&next) {
            TransitionChange::Added(next.difference(&self.transitions).copied().collect())
        } else if next.is_empty() {
            TransitionChange::Cleared
        } else {
            TransitionChange::Replaced
        };
        self.transitions = next;
        self.drop_stale_drag();
        self.commit(change)
    }

    pub fn add(&mut self, index: usize) -> EditOutcome {
        if !self.in_range(index) {
            return self.reject("add", index);
        }
        if !self.transitions.insert(index) {
            return EditOutcome::Unchanged;
        }
        self.commit(TransitionChange::Added(vec![index]))
    }

    pub fn delete(&mut self, index: usize) -> EditOutcome {
        if !self.in_range(index) {
            return self.reject("delete", index);
        }
        if !self.transitions.remove(&index) {
            return EditOutcome::Unchanged;
        }
        self.drop_stale_drag();
        self.commit(TransitionChange::Removed(vec![index]))
    }

    /// Snap `candidate` to the nearest of `positions` and move `old` there.
    ///
    /// `positions` must be ascending. Exact ties snap to the smaller
    /// position. Moving onto another existing transition merges the two.
    pub fn move_to(&mut self, old: usize, candidate: f64, positions: &[usize]) -> EditOutcome {
        if !self.in_range(old) || !self.transitions.contains(&old) {
            return self.reject("move", old);
        }
        let Some(snapped) = snap(candidate, positions) else {
            tracing::warn!(series = %self.series, candidate, "move: nothing to snap to, ignored");
            return EditOutcome::Rejected;
        };
        if !self.in_range(snapped) {
            return self.reject("move", snapped);
        }
        if snapped == old {
            return EditOutcome::Unchanged;
        }
        self.transitions.remove(&old);
        self.transitions.insert(snapped);
        self.commit(TransitionChange::Moved {
            from: old,
            to: snapped,
        })
    }

    /// Remove every transition; the controller becomes `Empty`.
    pub fn clear(&mut self) -> EditOutcome {
        self.drag = None;
        if self.transitions.is_empty() {
            return EditOutcome::Unchanged;
        }
        self.transitions.clear();
        self.commit(TransitionChange::Cleared)
    }

    /// Change the exclusion zones. Recomputes even in the `Empty` state.
    pub fn set_zones(&mut self, zones: ZoneWidths) -> EditOutcome {
        if zones == self.zones {
            return EditOutcome::Unchanged;
        }
        self.zones = zones;
        self.commit(TransitionChange::Zones)
    }

    pub fn set_left_zone(&mut self, left: usize) -> EditOutcome {
        self.set_zones(ZoneWidths::new(left, self.zones.right))
    }

    pub fn set_right_zone(&mut self, right: usize) -> EditOutcome {
        self.set_zones(ZoneWidths::new(self.zones.left, right))
    }

    /// Pick the transition `index` for dragging. Returns false if it is not
    /// a current transition.
    pub fn select(&mut self, index: usize) -> bool {
        if !self.transitions.contains(&index) {
            return false;
        }
        self.drag = Some(DragState {
            index,
            preview: index as f64,
        });
        true
    }

    /// Pick the transition closest to pointer `x`, if one lies within
    /// `tolerance` samples.
    pub fn select_near(&mut self, x: f64, tolerance: f64) -> Option<usize> {
        let best = self
            .transitions
            .iter()
            .copied()
            .map(|t| (t, (t as f64 - x).abs()))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)?;
        self.select(best);
        Some(best)
    }

    /// Follow the pointer while dragging. Nothing is committed.
    pub fn drag_to(&mut self, x: f64) {
        if let Some(drag) = self.drag.as_mut() {
            drag.preview = x;
        }
    }

    /// Snap the dragged line and commit it as a move.
    pub fn release(&mut self, positions: &[usize]) -> EditOutcome {
        let Some(drag) = self.drag.take() else {
            return EditOutcome::Unchanged;
        };
        self.move_to(drag.index, drag.preview, positions)
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Delete the line currently picked for dragging.
    pub fn delete_selected(&mut self) -> EditOutcome {
        match self.drag.take() {
            Some(drag) => self.delete(drag.index),
            None => EditOutcome::Unchanged,
        }
    }

    fn drop_stale_drag(&mut self) {
        if let Some(drag) = self.drag {
            if !self.transitions.contains(&drag.index) {
                self.drag = None;
            }
        }
    }
}

/// Nearest of the ascending `positions` to `x`; exact ties go to the
/// smaller position.
pub fn snap(x: f64, positions: &[usize]) -> Option<usize> {
    if !x.is_finite() || positions.is_empty() {
        return None;
    }
    let pos = positions.partition_point(|&p| (p as f64) < x);
    let mut best: Option<(usize, f64)> = None;
    // The two neighbours around the insertion point; lower one first so it
    // wins a tie.
    for candidate in [pos.wrapping_sub(1), pos] {
        if let Some(&p) = positions.get(candidate) {
            let diff = (p as f64 - x).abs();
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((p, diff));
            }
        }
    }
    best.map(|(p, _)| p)
}
