//! Analysis session: the loaded table, one reference-line controller per
//! active series, the statistics records and the configuration.
//!
//! Controllers publish their interval updates to a channel owned by the
//! workspace; [`Workspace::pump`] drains it and rebuilds the statistics of
//! every series that uses the updated intervals.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::AnalysisConfig;
use crate::error::{ConfigError, WorkspaceError};
use crate::processing::jumps::{Dispersion, JumpDetector};
use crate::processing::partition::StableInterval;
use crate::processing::statistics::{SeriesRecord, StatisticsEngine};
use crate::report::{build_rows, ReportRow};
use crate::state::reference_lines::{EditOutcome, IntervalUpdate, ReferenceLineController};
use crate::state::series_store::SeriesStore;

/// A user gesture aimed at one series' reference lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub series: String,
    pub kind: GestureKind,
}

impl Gesture {
    pub fn new(series: impl Into<String>, kind: GestureKind) -> Self {
        Self {
            series: series.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureKind {
    SetAll(Vec<usize>),
    Add(usize),
    Delete(usize),
    Move { old: usize, candidate: f64 },
    Clear,
    Select(usize),
    SelectNear { x: f64, tolerance: f64 },
    DragTo(f64),
    Release,
    CancelDrag,
    DeleteSelected,
}

pub struct Workspace {
    store: SeriesStore,
    config: AnalysisConfig,
    controllers: BTreeMap<String, ReferenceLineController>,
    /// target series -> series whose intervals it uses.
    follows: BTreeMap<String, String>,
    stats: StatisticsEngine,
    updates_tx: Sender<IntervalUpdate>,
    updates_rx: Receiver<IntervalUpdate>,
}

impl Workspace {
    pub fn new(store: SeriesStore, config: AnalysisConfig) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel();
        Self {
            store,
            config,
            controllers: BTreeMap::new(),
            follows: BTreeMap::new(),
            stats: StatisticsEngine::new(),
            updates_tx,
            updates_rx,
        }
    }

    /// Replace the table. Every series becomes inactive.
    pub fn load(&mut self, store: SeriesStore) {
        tracing::info!(
            series = store.names().count(),
            rows = store.length(),
            "table loaded"
        );
        self.store = store;
        self.controllers.clear();
        self.follows.clear();
        self.stats.clear();
        // Updates queued by the old controllers are meaningless now.
        self.updates_rx.try_iter().for_each(drop);
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn detector(&self) -> Result<JumpDetector, ConfigError> {
        Ok(JumpDetector::new(self.config.window(), self.config.threshold())?
            .with_dispersion(self.config.dispersion()))
    }

    /// Start editing `name`: seed its reference lines with detected jumps.
    /// Activating an already active series leaves it as it is.
    pub fn activate(&mut self, name: &str) -> Result<&ReferenceLineController, WorkspaceError> {
        if !self.controllers.contains_key(name) {
            let detector = self.detector()?;
            let values = self.store.values(name)?;
            let detected = detector.detect(values);
            tracing::info!(series = name, jumps = detected.len(), "series activated");

            let mut controller =
                ReferenceLineController::new(name, self.store.length(), self.config.zones());
            controller.add_subscriber(self.updates_tx.clone());
            let _ = controller.set_all(&detected);
            self.controllers.insert(name.to_string(), controller);
            // Nothing was published when detection found no jumps.
            self.pump();
            self.refresh_from(name);
        }
        self.controller(name)
            .ok_or_else(|| WorkspaceError::NotActive(name.to_string()))
    }

    /// Stop editing `name`. Series following it fall back to their own
    /// intervals, or lose their statistics if they are not active.
    pub fn deactivate(&mut self, name: &str) -> bool {
        if self.controllers.remove(name).is_none() {
            return false;
        }
        self.pump();
        let followers: Vec<String> = self
            .follows
            .iter()
            .filter(|(_, source)| source.as_str() == name)
            .map(|(target, _)| target.clone())
            .collect();
        for target in followers {
            self.follows.remove(&target);
            self.refresh(&target);
        }
        self.follows.remove(name);
        self.stats.remove(name);
        tracing::debug!(series = name, "series deactivated");
        true
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Active series in name order.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    pub fn controller(&self, name: &str) -> Option<&ReferenceLineController> {
        self.controllers.get(name)
    }

    /// Extra receiver for one series' interval updates.
    pub fn subscribe(&mut self, name: &str) -> Result<Receiver<IntervalUpdate>, WorkspaceError> {
        self.controllers
            .get_mut(name)
            .map(ReferenceLineController::subscribe)
            .ok_or_else(|| WorkspaceError::NotActive(name.to_string()))
    }

    /// Compute `target`'s statistics over the intervals of `source`.
    pub fn follow(&mut self, target: &str, source: &str) -> Result<(), WorkspaceError> {
        self.store.values(target)?;
        if !self.controllers.contains_key(source) {
            return Err(WorkspaceError::NotActive(source.to_string()));
        }
        if target == source {
            self.unfollow(target);
            return Ok(());
        }
        self.follows.insert(target.to_string(), source.to_string());
        self.refresh(target);
        Ok(())
    }

    pub fn unfollow(&mut self, target: &str) {
        if self.follows.remove(target).is_some() {
            self.refresh(target);
        }
    }

    /// Series whose intervals `name`'s statistics use.
    pub fn interval_source<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        match self.follows.get(name) {
            Some(source) => Some(source.as_str()),
            None if self.controllers.contains_key(name) => Some(name),
            None => None,
        }
    }

    pub fn intervals(&self, name: &str) -> Option<&[StableInterval]> {
        let source = self.interval_source(name)?;
        self.controllers.get(source).map(|c| c.intervals())
    }

    pub fn record(&self, name: &str) -> Option<&SeriesRecord> {
        self.stats.record(name)
    }

    /// Display rows of `name`'s statistics, floored to the configured
    /// precision.
    pub fn report(&self, name: &str) -> Option<Vec<ReportRow>> {
        let record = self.stats.record(name)?;
        let index = self
            .store
            .index_column()
            .map(|series| (series, self.store.index_kind()));
        Some(build_rows(record, index, self.config.precision()))
    }

    /// Route a gesture to its series' controller and bring the statistics
    /// up to date.
    ///
    /// Selection and pointer motion never notify: they report `Unchanged`,
    /// or `Rejected` when there is no line to pick.
    pub fn apply(&mut self, gesture: Gesture) -> Result<EditOutcome, WorkspaceError> {
        let store = &self.store;
        let controller = self
            .controllers
            .get_mut(&gesture.series)
            .ok_or_else(|| WorkspaceError::NotActive(gesture.series.clone()))?;

        tracing::debug!(series = %gesture.series, kind = ?gesture.kind, "gesture");
        let outcome = match gesture.kind {
            GestureKind::SetAll(indices) => controller.set_all(&indices),
            GestureKind::Add(index) => controller.add(index),
            GestureKind::Delete(index) => controller.delete(index),
            GestureKind::Move { old, candidate } => {
                controller.move_to(old, candidate, &store.sample_positions())
            }
            GestureKind::Clear => controller.clear(),
            GestureKind::Select(index) => {
                if controller.select(index) {
                    EditOutcome::Unchanged
                } else {
                    EditOutcome::Rejected
                }
            }
            GestureKind::SelectNear { x, tolerance } => match controller.select_near(x, tolerance) {
                Some(_) => EditOutcome::Unchanged,
                None => EditOutcome::Rejected,
            },
            GestureKind::DragTo(x) => {
                controller.drag_to(x);
                EditOutcome::Unchanged
            }
            GestureKind::Release => controller.release(&store.sample_positions()),
            GestureKind::CancelDrag => {
                controller.cancel_drag();
                EditOutcome::Unchanged
            }
            GestureKind::DeleteSelected => controller.delete_selected(),
        };
        self.pump();
        Ok(outcome)
    }

    /// Drain pending interval updates and rebuild the affected statistics.
    /// Returns the number of series whose intervals changed.
    pub fn pump(&mut self) -> usize {
        let updated: BTreeSet<String> = self.updates_rx.try_iter().map(|u| u.series).collect();
        for source in &updated {
            self.refresh_from(source);
        }
        updated.len()
    }

    /// Rebuild statistics for `source` and every series following it.
    fn refresh_from(&mut self, source: &str) {
        let mut affected: Vec<String> = self
            .follows
            .iter()
            .filter(|(_, s)| s.as_str() == source)
            .map(|(target, _)| target.clone())
            .collect();
        if !self.follows.contains_key(source) {
            affected.push(source.to_string());
        }
        for name in affected {
            self.refresh(&name);
        }
    }

    fn refresh(&mut self, name: &str) {
        let source = self.follows.get(name).map(String::as_str).unwrap_or(name);
        let (Some(controller), Ok(values)) = (self.controllers.get(source), self.store.values(name))
        else {
            self.stats.remove(name);
            return;
        };
        self.stats
            .recompute(name, values, source, controller.intervals());
    }

    /// Re-run detection on every active series and replace its lines.
    fn redetect(&mut self) -> Result<(), WorkspaceError> {
        let detector = self.detector()?;
        for (name, controller) in self.controllers.iter_mut() {
            let values = self.store.values(name)?;
            let detected = detector.detect(values);
            if controller.set_all(&detected).is_applied() {
                tracing::info!(series = %name, jumps = detected.len(), "transitions re-detected");
            }
        }
        self.pump();
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), WorkspaceError> {
        self.config.set_threshold(threshold)?;
        self.redetect()
    }

    pub fn set_window(&mut self, window: i64) -> Result<(), WorkspaceError> {
        self.config.set_window(window)?;
        self.redetect()
    }

    pub fn set_dispersion(&mut self, dispersion: Dispersion) -> Result<(), WorkspaceError> {
        if dispersion == self.config.dispersion() {
            return Ok(());
        }
        self.config.set_dispersion(dispersion);
        self.redetect()
    }

    /// Zone widths apply to every active series.
    pub fn set_zones(&mut self, left: i64, right: i64) -> Result<(), WorkspaceError> {
        self.config.set_zones(left, right)?;
        let zones = self.config.zones();
        for controller in self.controllers.values_mut() {
            let _ = controller.set_zones(zones);
        }
        self.pump();
        Ok(())
    }

    /// Display precision only; statistics are untouched.
    pub fn set_precision(&mut self, precision: i64) -> Result<(), WorkspaceError> {
        self.config.set_precision(precision)?;
        Ok(())
    }

    /// Replace the whole configuration, re-detecting and re-zoning as needed.
    pub fn set_config(&mut self, config: AnalysisConfig) -> Result<(), WorkspaceError> {
        let previous = self.config;
        self.config = config;
        let detection_changed = previous.window() != config.window()
            || previous.threshold() != config.threshold()
            || previous.dispersion() != config.dispersion();
        if detection_changed {
            self.redetect()?;
        }
        if previous.zones() != config.zones() {
            for controller in self.controllers.values_mut() {
                let _ = controller.set_zones(config.zones());
            }
            self.pump();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::state::reference_lines::LineState;

    fn step(len: usize, at: usize, low: f64, high: f64) -> Vec<f64> {
        (0..len).map(|i| if i < at { low } else { high }).collect()
    }

    fn config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.set_window(5).unwrap();
        config.set_threshold(0.5).unwrap();
        config.set_zones(2, 2).unwrap();
        config
    }

    fn workspace() -> Workspace {
        let mut store = SeriesStore::new();
        store.set_series("p", step(60, 20, 0.0, 10.0)).unwrap();
        store.set_series("q", (0..60).map(|i| i as f64).collect()).unwrap();
        Workspace::new(store, config())
    }

    fn pairs(intervals: &[StableInterval]) -> Vec<(usize, usize)> {
        intervals.iter().map(|iv| (iv.start, iv.end)).collect()
    }

    #[test]
    fn test_activate_seeds_from_detection() {
        let mut ws = workspace();
        let controller = ws.activate("p").unwrap();
        assert_eq!(controller.transitions(), vec![20]);
        assert_eq!(pairs(ws.intervals("p").unwrap()), vec![(0, 18), (22, 59)]);
        assert_eq!(ws.record("p").unwrap().means(), vec![Some(0.0), Some(10.0)]);
    }

    #[test]
    fn test_activate_without_jumps_covers_whole_series() {
        let mut ws = workspace();
        ws.set_threshold(1000.0).unwrap();
        assert_eq!(ws.activate("p").unwrap().state(), LineState::Empty);
        let record = ws.record("p").unwrap();
        assert_eq!(record.rows.len(), 1);
        assert_eq!(record.rows[0].interval, StableInterval::new(0, 59));
    }

    #[test]
    fn test_unknown_and_inactive_series() {
        let mut ws = workspace();
        assert!(matches!(
            ws.activate("nope"),
            Err(WorkspaceError::Store(StoreError::UnknownSeries(_)))
        ));
        assert!(matches!(
            ws.apply(Gesture::new("p", GestureKind::Add(3))),
            Err(WorkspaceError::NotActive(_))
        ));
    }

    #[test]
    fn test_gesture_updates_statistics() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        let outcome = ws.apply(Gesture::new("p", GestureKind::Add(40))).unwrap();
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(
            pairs(ws.intervals("p").unwrap()),
            vec![(0, 18), (22, 38), (42, 59)]
        );
        assert_eq!(ws.record("p").unwrap().rows.len(), 3);

        let outcome = ws.apply(Gesture::new("p", GestureKind::Delete(99))).unwrap();
        assert_eq!(outcome, EditOutcome::Rejected);
        assert_eq!(ws.record("p").unwrap().rows.len(), 3);
    }

    #[test]
    fn test_gestures_stay_on_their_series() {
        let mut store = SeriesStore::new();
        store.set_series("p", step(60, 20, 0.0, 10.0)).unwrap();
        store.set_series("q", step(60, 40, 0.0, 3.0)).unwrap();
        let mut ws = Workspace::new(store, config());
        ws.activate("p").unwrap();
        ws.activate("q").unwrap();
        let q_rx = ws.subscribe("q").unwrap();
        let snapshot = |ws: &Workspace| {
            (
                ws.controller("q").unwrap().transitions(),
                ws.intervals("q").unwrap().to_vec(),
                ws.record("q").cloned(),
            )
        };
        let before = snapshot(&ws);
        assert_eq!(before.0, vec![40]);

        let edits = [
            GestureKind::Add(50),
            GestureKind::Move {
                old: 20,
                candidate: 25.0,
            },
            GestureKind::SetAll(vec![10, 30]),
            GestureKind::Clear,
        ];
        for kind in edits {
            assert!(ws.apply(Gesture::new("p", kind)).unwrap().is_applied());
        }

        assert!(ws.controller("p").unwrap().transitions().is_empty());
        assert_eq!(snapshot(&ws), before);
        assert_eq!(q_rx.try_iter().count(), 0);
    }

    #[test]
    fn test_drag_through_workspace() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        let select = GestureKind::SelectNear {
            x: 21.0,
            tolerance: 2.0,
        };
        assert_eq!(ws.apply(Gesture::new("p", select)).unwrap(), EditOutcome::Unchanged);
        let _ = ws.apply(Gesture::new("p", GestureKind::DragTo(29.6))).unwrap();
        assert_eq!(ws.controller("p").unwrap().transitions(), vec![20]);
        let outcome = ws.apply(Gesture::new("p", GestureKind::Release)).unwrap();
        assert!(outcome.is_applied());
        assert_eq!(ws.controller("p").unwrap().transitions(), vec![30]);
        assert_eq!(pairs(ws.intervals("p").unwrap()), vec![(0, 28), (32, 59)]);
    }

    #[test]
    fn test_follower_uses_source_intervals() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        assert!(matches!(ws.follow("p", "q"), Err(WorkspaceError::NotActive(_))));
        ws.follow("q", "p").unwrap();
        assert_eq!(ws.interval_source("q"), Some("p"));
        let record = ws.record("q").unwrap();
        assert_eq!(record.interval_source, "p");
        // q is 0..60 so each interval's mean is its midpoint.
        assert_eq!(record.means(), vec![Some(9.0), Some(40.5)]);

        let _ = ws.apply(Gesture::new("p", GestureKind::Clear)).unwrap();
        assert_eq!(ws.record("q").unwrap().means(), vec![Some(29.5)]);

        ws.deactivate("p");
        assert!(ws.record("q").is_none());
        assert_eq!(ws.interval_source("q"), None);
    }

    #[test]
    fn test_threshold_change_redetects() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        let rx = ws.subscribe("p").unwrap();
        ws.set_threshold(100.0).unwrap();
        assert_eq!(ws.controller("p").unwrap().state(), LineState::Empty);
        assert_eq!(rx.try_iter().count(), 1);
        // Unchanged detection result does not notify.
        ws.set_threshold(200.0).unwrap();
        assert_eq!(rx.try_iter().count(), 0);
        assert!(ws.set_threshold(-1.0).is_err());
        assert_eq!(ws.config().threshold(), 200.0);
    }

    #[test]
    fn test_zone_change_applies_to_all_active() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        ws.activate("q").unwrap();
        ws.set_zones(4, 1).unwrap();
        assert_eq!(pairs(ws.intervals("p").unwrap()), vec![(0, 16), (21, 59)]);
        assert_eq!(
            ws.controller("q").unwrap().zones(),
            crate::processing::partition::ZoneWidths::new(4, 1)
        );
        assert!(ws.set_zones(-1, 0).is_err());
    }

    #[test]
    fn test_report_uses_precision() {
        let mut ws = workspace();
        // A unit ramp has a rolling deviation of about 1.41; stay above it.
        ws.set_threshold(5.0).unwrap();
        ws.activate("q").unwrap();
        ws.set_precision(1).unwrap();
        let rows = ws.report("q").unwrap();
        assert_eq!(rows[0].interval, "0 - 59");
        assert_eq!(rows[0].mean, "29.5");
        assert_eq!(rows[0].max_index, "59");
    }

    #[test]
    fn test_load_resets_session() {
        let mut ws = workspace();
        ws.activate("p").unwrap();
        let mut store = SeriesStore::new();
        store.set_series("r", vec![1.0; 10]).unwrap();
        ws.load(store);
        assert_eq!(ws.active().count(), 0);
        assert!(ws.record("p").is_none());
        ws.activate("r").unwrap();
        assert_eq!(ws.record("r").unwrap().means(), vec![Some(1.0)]);
    }
}
