//! Playback configuration.
//!
//! Loaded once before playback (JSON or builder calls) and validated up
//! front. Step size and trail window may also be changed at runtime through
//! the controller, which re-validates them.

use crate::camera::ChaseConfig;
use crate::error::ConfigError;
use crate::interpolation::Precision;
use crate::style::{LineStyle, Rgba};
use crate::trajectory::TimeExtent;
use serde::{Deserialize, Serialize};
use skytrail_env::EntityId;
use std::collections::HashMap;

/// Default step: five minutes of data time per tick.
pub const DEFAULT_STEP_SECONDS: f64 = 300.0;

/// Default wall-clock interval between ticks, in milliseconds.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Data seconds advanced per tick
    pub step_seconds: f64,

    /// Wall-clock milliseconds between ticks
    pub frame_interval_ms: u64,

    /// Trail length in data seconds; 0 keeps the full history
    pub trail_window_seconds: f64,

    /// Per-entity trail windows that win over `trail_window_seconds`
    pub window_overrides: HashMap<EntityId, f64>,

    pub precision: Precision,

    pub line_style: LineStyle,

    /// Trail colour for trajectories that carry none
    pub default_color: Rgba,

    /// Replaces the dataset's own extent for looping and the initial time
    pub time_extent: Option<TimeExtent>,

    pub chase: ChaseConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            trail_window_seconds: 0.0,
            window_overrides: HashMap::new(),
            precision: Precision::Full,
            line_style: LineStyle::default(),
            default_color: Rgba::CYAN,
            time_extent: None,
            chase: ChaseConfig::default(),
        }
    }
}

pub(crate) fn check_step(step: f64) -> Result<(), ConfigError> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidStep(step))
    }
}

pub(crate) fn check_window(window: f64) -> Result<(), ConfigError> {
    if window.is_finite() && window >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidWindow(window))
    }
}

impl PlaybackConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_step(self.step_seconds)?;
        check_window(self.trail_window_seconds)?;
        self.precision.validate()?;
        self.line_style.validate()?;
        for window in self.window_overrides.values() {
            check_window(*window)?;
        }
        if let Some(extent) = self.time_extent {
            if !(extent.start.is_finite() && extent.end.is_finite() && extent.start <= extent.end)
            {
                return Err(ConfigError::InvalidExtent {
                    start: extent.start,
                    end: extent.end,
                });
            }
        }
        self.chase.validate()
    }

    /// Trail window for `entity`, honouring overrides.
    pub fn window_for(&self, entity: &EntityId) -> f64 {
        self.window_overrides
            .get(entity)
            .copied()
            .unwrap_or(self.trail_window_seconds)
    }

    pub fn with_step(mut self, step_seconds: f64) -> Self {
        self.step_seconds = step_seconds;
        self
    }

    pub fn with_frame_interval_ms(mut self, interval: u64) -> Self {
        self.frame_interval_ms = interval;
        self
    }

    pub fn with_trail_window(mut self, seconds: f64) -> Self {
        self.trail_window_seconds = seconds;
        self
    }

    pub fn with_window_override(mut self, entity: impl Into<EntityId>, seconds: f64) -> Self {
        self.window_overrides.insert(entity.into(), seconds);
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    pub fn with_default_color(mut self, color: Rgba) -> Self {
        self.default_color = color;
        self
    }

    pub fn with_time_extent(mut self, extent: TimeExtent) -> Self {
        self.time_extent = Some(extent);
        self
    }

    pub fn with_chase(mut self, chase: ChaseConfig) -> Self {
        self.chase = chase;
        self
    }
}
