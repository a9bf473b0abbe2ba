//! Trajectory data model.
//!
//! A [`Trajectory`] is one entity's time-ordered position history, already
//! projected into the scene's planar metric coordinates. Trajectories are
//! validated once when built and are immutable afterwards; a [`Dataset`]
//! holds every accepted trajectory of one load behind an `Arc` so the
//! controller and the render host can share it read-only.

use crate::error::TrajectoryError;
use crate::style::Rgba;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use skytrail_env::EntityId;
use std::collections::HashMap;
use tracing::{info, warn};

/// One timestamped position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in seconds (unix seconds for real data)
    pub t: f64,

    /// Position [x, y, z]; z is 0 when elevation is unknown
    pub position: Vector3<f64>,
}

impl Sample {
    pub fn new(t: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            t,
            position: Vector3::new(x, y, z),
        }
    }

    fn is_finite(&self) -> bool {
        self.t.is_finite() && self.position.iter().all(|v| v.is_finite())
    }
}

/// A validated, immutable per-entity sample sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    entity_id: EntityId,
    // Sorted by t, non-decreasing, at least two entries
    samples: Vec<Sample>,
    color: Option<Rgba>,
}

impl Trajectory {
    /// Validates `samples` and builds a trajectory.
    ///
    /// Rejects sequences with fewer than two samples, timestamps that go
    /// backwards, and non-finite values. Equal consecutive timestamps are
    /// allowed.
    pub fn new(entity_id: EntityId, samples: Vec<Sample>) -> Result<Self, TrajectoryError> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(TrajectoryError::NonFinite {
                entity: entity_id,
                index,
            });
        }
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].t < pair[0].t {
                return Err(TrajectoryError::NonMonotonic {
                    entity: entity_id,
                    index: index + 1,
                    previous: pair[0].t,
                    next: pair[1].t,
                });
            }
        }
        if samples.len() < 2 {
            return Err(TrajectoryError::TooFewSamples {
                entity: entity_id,
                count: samples.len(),
            });
        }
        Ok(Self {
            entity_id,
            samples,
            color: None,
        })
    }

    /// Attaches a display colour.
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn color(&self) -> Option<Rgba> {
        self.color
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn sample(&self, index: usize) -> &Sample {
        &self.samples[index]
    }

    /// Number of samples (always >= 2).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of segments (`len() - 1`).
    pub fn segment_count(&self) -> usize {
        self.samples.len() - 1
    }

    pub fn start_time(&self) -> f64 {
        self.samples[0].t
    }

    pub fn end_time(&self) -> f64 {
        self.samples[self.samples.len() - 1].t
    }

    pub fn extent(&self) -> TimeExtent {
        TimeExtent::new(self.start_time(), self.end_time())
    }
}

/// A closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeExtent {
    pub start: f64,
    pub end: f64,
}

impl TimeExtent {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Smallest extent covering both.
    pub fn union(&self, other: &TimeExtent) -> TimeExtent {
        TimeExtent::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Unvalidated track as handed over by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrack {
    pub entity_id: EntityId,
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub color: Option<Rgba>,
}

impl RawTrack {
    pub fn new(entity_id: impl Into<EntityId>, samples: Vec<Sample>) -> Self {
        Self {
            entity_id: entity_id.into(),
            samples,
            color: None,
        }
    }

    /// Validates into a [`Trajectory`].
    pub fn into_trajectory(self) -> Result<Trajectory, TrajectoryError> {
        let color = self.color;
        let trajectory = Trajectory::new(self.entity_id, self.samples)?;
        Ok(match color {
            Some(color) => trajectory.with_color(color),
            None => trajectory,
        })
    }
}

/// Every accepted trajectory of one load, plus what was rejected.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    trajectories: Vec<Trajectory>,
    rejected: Vec<TrajectoryError>,
    index: HashMap<EntityId, usize>,
    extent: Option<TimeExtent>,
}

impl Dataset {
    /// Builds a dataset, skipping tracks that fail validation.
    ///
    /// A rejected track is logged and recorded; it never prevents the other
    /// tracks from loading. When two tracks share an id the first one wins.
    pub fn from_raw(tracks: impl IntoIterator<Item = RawTrack>) -> Self {
        let mut dataset = Dataset::default();
        for track in tracks {
            match track.into_trajectory() {
                Ok(trajectory) => dataset.insert(trajectory),
                Err(err) => {
                    warn!("Skipping entity: {}", err);
                    dataset.rejected.push(err);
                }
            }
        }
        info!(
            "Dataset loaded: {} trajectories, {} rejected",
            dataset.trajectories.len(),
            dataset.rejected.len()
        );
        dataset
    }

    /// Builds a dataset from already-validated trajectories.
    pub fn from_trajectories(trajectories: impl IntoIterator<Item = Trajectory>) -> Self {
        let mut dataset = Dataset::default();
        for trajectory in trajectories {
            dataset.insert(trajectory);
        }
        dataset
    }

    fn insert(&mut self, trajectory: Trajectory) {
        if self.index.contains_key(trajectory.entity_id()) {
            warn!("Duplicate entity {} ignored", trajectory.entity_id());
            return;
        }
        let extent = trajectory.extent();
        self.extent = Some(match self.extent {
            Some(current) => current.union(&extent),
            None => extent,
        });
        self.index
            .insert(trajectory.entity_id().clone(), self.trajectories.len());
        self.trajectories.push(trajectory);
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    pub fn rejected(&self) -> &[TrajectoryError] {
        &self.rejected
    }

    /// Position of an entity in `trajectories()`.
    pub fn position_of(&self, entity: &EntityId) -> Option<usize> {
        self.index.get(entity).copied()
    }

    pub fn get(&self, entity: &EntityId) -> Option<&Trajectory> {
        self.position_of(entity).map(|i| &self.trajectories[i])
    }

    /// Time extent across all accepted trajectories; `None` when empty.
    pub fn extent(&self) -> Option<TimeExtent> {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}
