//! Trail styling, resolved once when a dataset is bound to the render host.

use crate::error::ConfigError;
use crate::trajectory::Dataset;
use serde::{Deserialize, Serialize};
use skytrail_env::EntityId;

/// RGBA display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Cyan, the default trail colour.
    pub const CYAN: Rgba = Rgba([0, 255, 255, 255]);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::CYAN
    }
}

/// How a trail line sits in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LineStyle {
    /// Draped on the ground surface; sample elevation is ignored.
    Draped,
    /// Drawn at absolute height: sample z plus `offset`.
    Elevated { offset: f64 },
}

impl Default for LineStyle {
    fn default() -> Self {
        LineStyle::Elevated { offset: 0.0 }
    }
}

impl LineStyle {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            LineStyle::Elevated { offset } if !offset.is_finite() => {
                Err(ConfigError::InvalidLineOffset(offset))
            }
            _ => Ok(()),
        }
    }

    /// Height at which a point with elevation `z` is drawn, `None` when the
    /// host should clamp it to the ground.
    pub fn render_height(&self, z: f64) -> Option<f64> {
        match self {
            LineStyle::Draped => None,
            LineStyle::Elevated { offset } => Some(z + offset),
        }
    }
}

/// Visual binding of one entity's trail, handed to the host once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailBinding {
    pub entity_id: EntityId,
    pub color: Rgba,
    pub style: LineStyle,
}

/// Resolves the colour and line style of every trajectory in `dataset`.
///
/// A trajectory's own colour wins over `default_color`.
pub fn bind_trails(dataset: &Dataset, default_color: Rgba, style: LineStyle) -> Vec<TrailBinding> {
    dataset
        .trajectories()
        .iter()
        .map(|traj| TrailBinding {
            entity_id: traj.entity_id().clone(),
            color: traj.color().unwrap_or(default_color),
            style,
        })
        .collect()
}
