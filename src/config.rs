//! View and platform configuration.
//!
//! [`ViewConfig`] controls how a single [`DrawView`](crate::view::DrawView)
//! schedules frames, keeps timing statistics and reacts to draw errors.
//! [`PlatformConfig`] describes the display a platform context drives.
//!
//! Both provide defaults via [`Default`] and a fluent builder with
//! validation. They also (de)serialize with `serde`, so hosts can keep
//! them in a JSON settings file.
//!
//! # Examples
//!
//! ```rust
//! use canvas_dom::config::ViewConfig;
//! use canvas_dom::view::DrawingMode;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ViewConfig::builder()
//!     .duration_samples(30)
//!     .show_debug_overlay(true)
//!     .drawing_mode(DrawingMode::Continuous)
//!     .build()?; // returns Result<ViewConfig, ConfigError>
//! assert_eq!(cfg.duration_samples, 30);
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `duration_samples`: ring buffer size for frame durations (default: 10, at least 1).
//! - `show_debug_overlay`: draw the timing overlay (default: false).
//! - `overlay_font_size`: overlay text size in logical pixels (default: 16).
//! - `overlay_origin`: overlay text position (default: `(18, 18)`).
//! - `drawing_mode`: mode a new view starts in (default: on demand).
//! - `retain_callback_on_error`: keep the draw callback after a failed frame (default: true).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::view::DrawingMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub duration_samples: usize,
    pub show_debug_overlay: bool,
    pub overlay_font_size: f32,
    pub overlay_origin: (f32, f32),
    pub drawing_mode: DrawingMode,
    pub retain_callback_on_error: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            duration_samples: 10,
            show_debug_overlay: false,
            overlay_font_size: 16.0,
            overlay_origin: (18.0, 18.0),
            drawing_mode: DrawingMode::OnDemand,
            retain_callback_on_error: true,
        }
    }
}

impl ViewConfig {
    pub fn builder() -> ViewConfigBuilder {
        ViewConfigBuilder::default()
    }

    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: ViewConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate_view(&cfg)?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewConfigBuilder {
    inner: ViewConfig,
}

impl ViewConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ViewConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn duration_samples(self, n: usize) -> Self { self.map(|c| c.duration_samples = n) }
    pub fn show_debug_overlay(self, on: bool) -> Self { self.map(|c| c.show_debug_overlay = on) }
    pub fn overlay_font_size(self, size: f32) -> Self { self.map(|c| c.overlay_font_size = size) }
    pub fn overlay_origin(self, x: f32, y: f32) -> Self { self.map(|c| c.overlay_origin = (x, y)) }
    pub fn drawing_mode(self, mode: DrawingMode) -> Self { self.map(|c| c.drawing_mode = mode) }
    pub fn retain_callback_on_error(self, on: bool) -> Self { self.map(|c| c.retain_callback_on_error = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ViewConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ViewConfig, ConfigError> {
        validate_view(&self.inner)?;
        Ok(self.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Display refresh rate driving continuous draw loops, in Hz.
    pub refresh_rate: u32,
    /// Physical pixels per logical pixel.
    pub pixel_density: f32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 60,
            pixel_density: 1.0,
        }
    }
}

impl PlatformConfig {
    pub fn builder() -> PlatformConfigBuilder {
        PlatformConfigBuilder::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: PlatformConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate_platform(&cfg)?;
        Ok(cfg)
    }

    /// Time between two display refreshes.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_rate.max(1) as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlatformConfigBuilder {
    inner: PlatformConfig,
}

impl PlatformConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut PlatformConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn refresh_rate(self, hz: u32) -> Self { self.map(|c| c.refresh_rate = hz) }
    pub fn pixel_density(self, pd: f32) -> Self { self.map(|c| c.pixel_density = pd) }

    pub fn with(self, f: impl FnOnce(&mut PlatformConfig)) -> Self { self.map(f) }

    pub fn build(self) -> Result<PlatformConfig, ConfigError> {
        validate_platform(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroDurationSamples,
    InvalidFontSize(f32),
    InvalidRefreshRate(u32),
    InvalidPixelDensity(f32),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroDurationSamples =>
                write!(f, "duration_samples must be at least 1"),
            ConfigError::InvalidFontSize(s) =>
                write!(f, "overlay_font_size {s} must be positive"),
            ConfigError::InvalidRefreshRate(hz) =>
                write!(f, "refresh_rate {hz} is out of range (expected 1..=480)"),
            ConfigError::InvalidPixelDensity(pd) =>
                write!(f, "pixel_density {pd} must be a positive finite number"),
            ConfigError::Parse(msg) =>
                write!(f, "invalid configuration: {msg}"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate_view(c: &ViewConfig) -> Result<(), ConfigError> {
    if c.duration_samples == 0 {
        return Err(ConfigError::ZeroDurationSamples);
    }
    if !c.overlay_font_size.is_finite() || c.overlay_font_size <= 0.0 {
        return Err(ConfigError::InvalidFontSize(c.overlay_font_size));
    }
    Ok(())
}

fn validate_platform(c: &PlatformConfig) -> Result<(), ConfigError> {
    if !(1..=480).contains(&c.refresh_rate) {
        return Err(ConfigError::InvalidRefreshRate(c.refresh_rate));
    }
    if !c.pixel_density.is_finite() || c.pixel_density <= 0.0 {
        return Err(ConfigError::InvalidPixelDensity(c.pixel_density));
    }
    Ok(())
}

// ---------- Logging ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Installs an `env_logger` logger for hosts and demos. `RUST_LOG` still
/// overrides `level`. Calling it more than once is harmless.
pub fn init_logging(level: LogLevel) {
    let _ = env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ViewConfig::builder().build().is_ok());
        assert!(PlatformConfig::builder().build().is_ok());
    }

    #[test]
    fn builder_validates() {
        assert_eq!(
            ViewConfig::builder().duration_samples(0).build(),
            Err(ConfigError::ZeroDurationSamples)
        );
        assert_eq!(
            PlatformConfig::builder().pixel_density(0.0).build(),
            Err(ConfigError::InvalidPixelDensity(0.0))
        );
        assert_eq!(
            PlatformConfig::builder().refresh_rate(0).build(),
            Err(ConfigError::InvalidRefreshRate(0))
        );
    }

    #[test]
    fn json_fills_in_defaults() {
        let cfg = ViewConfig::from_json(r#"{ "drawing_mode": "continuous", "show_debug_overlay": true }"#)
            .unwrap();
        assert_eq!(cfg.drawing_mode, DrawingMode::Continuous);
        assert!(cfg.show_debug_overlay);
        assert_eq!(cfg.duration_samples, 10);

        assert!(matches!(
            ViewConfig::from_json(r#"{ "duration_samples": 0 }"#),
            Err(ConfigError::ZeroDurationSamples)
        ));
        assert!(matches!(ViewConfig::from_json("nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn frame_interval_follows_refresh_rate() {
        let cfg = PlatformConfig::builder().refresh_rate(50).build().unwrap();
        assert_eq!(cfg.frame_interval().as_micros(), 20_000);
    }
}
