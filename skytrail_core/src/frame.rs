//! Per-tick snapshots published to the render host.
//!
//! A [`Frame`] is built from scratch every tick and never mutated after it
//! is handed out; the host redraws from it instead of observing engine state.

use crate::camera::CameraPose;
use crate::readout::to_datetime;
use crate::trail::TrailWindow;
use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use skytrail_env::EntityId;

/// Where one entity is at the frame's query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedState {
    pub entity_id: EntityId,

    /// Interpolated position (rounded if the config asks for it)
    pub position: Vector3<f64>,

    /// Compass heading in degrees; `None` until the entity has moved horizontally
    pub heading: Option<f64>,

    /// Segment the position was interpolated in
    pub segment_index: usize,
}

/// Everything the host needs to draw one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFrame {
    #[serde(flatten)]
    pub state: InterpolatedState,

    /// Stored samples visible in the trail, `None` if only the live point is
    pub window: Option<TrailWindow>,

    /// Trail polyline; the last point is always `state.position`
    pub trail: Vec<Vector3<f64>>,
}

impl EntityFrame {
    pub fn entity_id(&self) -> &EntityId {
        &self.state.entity_id
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.state.position
    }

    pub fn heading(&self) -> Option<f64> {
        self.state.heading
    }
}

/// One published tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic publish counter
    pub sequence: u64,

    /// Query time every entity in this frame was evaluated at
    pub time: f64,

    pub entities: Vec<EntityFrame>,

    /// Chase camera pose; `None` leaves the host camera alone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraPose>,
}

impl Frame {
    pub fn entity(&self, id: &EntityId) -> Option<&EntityFrame> {
        self.entities.iter().find(|e| e.entity_id() == id)
    }

    /// Query time as a UTC date, for hosts that light the scene by sun position.
    pub fn sun_date(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.time)
    }
}
