use std::path::PathBuf;

use thiserror::Error;

/// Which exclusion zone a configuration value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSide {
    Left,
    Right,
}

impl std::fmt::Display for ZoneSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneSide::Left => f.write_str("left"),
            ZoneSide::Right => f.write_str("right"),
        }
    }
}

/// Configuration rejected at the boundary. Values are never clamped.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rolling window must be at least 1, got {0}")]
    InvalidWindow(i64),

    #[error("threshold must be a finite value >= 0, got {0}")]
    InvalidThreshold(f64),

    #[error("{side} zone width must be >= 0, got {value}")]
    NegativeZone { side: ZoneSide, value: i64 },

    #[error("display precision must be >= 0, got {0}")]
    NegativePrecision(i64),

    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Statistics could not be computed for an interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// Empty interval, interval outside the series, or no finite samples.
    #[error("no data in interval [{start}, {end}]")]
    NoData { start: usize, end: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("series {name:?} has {got} samples but the table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("unknown series {0:?}")]
    UnknownSeries(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("no data found after header detection")]
    NoData,

    #[error("no numeric columns in table")]
    NoNumericColumns,
}

/// Errors surfaced by [`crate::state::workspace::Workspace`] operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("series {0:?} is not active")]
    NotActive(String),
}
