use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ZoneSide};
use crate::processing::jumps::Dispersion;
use crate::processing::partition::ZoneWidths;

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_THRESHOLD: f64 = 1.0;
pub const DEFAULT_PRECISION: u32 = 3;

/// Runtime-adjustable analysis parameters.
///
/// Construction and deserialization both validate, so a value of this type
/// always satisfies `window >= 1`, `threshold >= 0` (finite).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig", into = "RawConfig")]
pub struct AnalysisConfig {
    window: usize,
    threshold: f64,
    zones: ZoneWidths,
    precision: u32,
    dispersion: Dispersion,
}

/// Unvalidated, signed form of [`AnalysisConfig`] as it appears on disk or
/// comes in from a UI control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub window: i64,
    pub threshold: f64,
    pub left_zone: i64,
    pub right_zone: i64,
    pub precision: i64,
    pub dispersion: Dispersion,
}

impl Default for RawConfig {
    fn default() -> Self {
        AnalysisConfig::default().into()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
            zones: ZoneWidths::default(),
            precision: DEFAULT_PRECISION,
            dispersion: Dispersion::default(),
        }
    }
}

impl TryFrom<RawConfig> for AnalysisConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            window: validate_window(raw.window)?,
            threshold: validate_threshold(raw.threshold)?,
            zones: ZoneWidths::new(
                validate_zone(ZoneSide::Left, raw.left_zone)?,
                validate_zone(ZoneSide::Right, raw.right_zone)?,
            ),
            precision: validate_precision(raw.precision)?,
            dispersion: raw.dispersion,
        })
    }
}

impl From<AnalysisConfig> for RawConfig {
    fn from(cfg: AnalysisConfig) -> Self {
        Self {
            window: cfg.window as i64,
            threshold: cfg.threshold,
            left_zone: cfg.zones.left as i64,
            right_zone: cfg.zones.right as i64,
            precision: cfg.precision as i64,
            dispersion: cfg.dispersion,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::try_from(raw)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn zones(&self) -> ZoneWidths {
        self.zones
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn dispersion(&self) -> Dispersion {
        self.dispersion
    }

    pub fn set_window(&mut self, window: i64) -> Result<(), ConfigError> {
        self.window = validate_window(window)?;
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        self.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    pub fn set_zones(&mut self, left: i64, right: i64) -> Result<(), ConfigError> {
        // Validate both before touching either.
        let left = validate_zone(ZoneSide::Left, left)?;
        let right = validate_zone(ZoneSide::Right, right)?;
        self.zones = ZoneWidths::new(left, right);
        Ok(())
    }

    pub fn set_precision(&mut self, precision: i64) -> Result<(), ConfigError> {
        self.precision = validate_precision(precision)?;
        Ok(())
    }

    pub fn set_dispersion(&mut self, dispersion: Dispersion) {
        self.dispersion = dispersion;
    }
}

fn validate_window(window: i64) -> Result<usize, ConfigError> {
    if window < 1 {
        return Err(ConfigError::InvalidWindow(window));
    }
    Ok(window as usize)
}

fn validate_threshold(threshold: f64) -> Result<f64, ConfigError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ConfigError::InvalidThreshold(threshold));
    }
    Ok(threshold)
}

fn validate_zone(side: ZoneSide, value: i64) -> Result<usize, ConfigError> {
    if value < 0 {
        return Err(ConfigError::NegativeZone { side, value });
    }
    Ok(value as usize)
}

fn validate_precision(precision: i64) -> Result<u32, ConfigError> {
    if precision < 0 {
        return Err(ConfigError::NegativePrecision(precision));
    }
    Ok(precision.min(u32::MAX as i64) as u32)
}
