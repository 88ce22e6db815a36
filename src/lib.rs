//! Jump detection and stable-interval statistics for sampled time series.
//!
//! A loaded table ([`state::series_store::SeriesStore`]) is scanned for
//! abrupt level changes ([`processing::jumps`]). Each change becomes an
//! editable reference line ([`state::reference_lines`]), the series is split
//! into stable intervals around the lines ([`processing::partition`]) and
//! every interval gets its mean and extrema ([`processing::statistics`]).
//! [`state::workspace::Workspace`] ties these together for a session.

pub mod config;
pub mod data;
pub mod error;
pub mod processing;
pub mod report;
pub mod state;

pub use config::AnalysisConfig;
pub use error::{ConfigError, LoadError, StatsError, StoreError, WorkspaceError};
pub use processing::jumps::{Dispersion, JumpDetector};
pub use processing::partition::{partition, StableInterval, ZoneWidths};
pub use state::reference_lines::{EditOutcome, IntervalUpdate, LineState, ReferenceLineController};
pub use state::series_store::SeriesStore;
pub use state::workspace::{Gesture, GestureKind, Workspace};
