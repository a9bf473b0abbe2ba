//! Error types for the playback engine.
//!
//! Nothing in here is fatal to a running replay: data errors exclude one
//! entity, config errors are raised before playback starts, and host errors
//! are recorded and displayed while frames keep flowing.

use skytrail_env::{EntityId, HostError};
use thiserror::Error;

/// A trajectory that cannot be interpolated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    /// Fewer than two samples: no segment to interpolate along.
    #[error("trajectory {entity} has {count} sample(s), need at least 2")]
    TooFewSamples { entity: EntityId, count: usize },

    /// A sample is timestamped before its predecessor.
    #[error("trajectory {entity} out of order at sample {index}: {previous} then {next}")]
    NonMonotonic {
        entity: EntityId,
        index: usize,
        previous: f64,
        next: f64,
    },

    /// A timestamp or coordinate is NaN or infinite.
    #[error("trajectory {entity} has a non-finite value at sample {index}")]
    NonFinite { entity: EntityId, index: usize },
}

impl TrajectoryError {
    /// The entity the error refers to.
    pub fn entity(&self) -> &EntityId {
        match self {
            Self::TooFewSamples { entity, .. }
            | Self::NonMonotonic { entity, .. }
            | Self::NonFinite { entity, .. } => entity,
        }
    }
}

/// Invalid playback configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("step size must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("trail window must be zero or positive, got {0}")]
    InvalidWindow(f64),

    #[error("chase camera {field} must be zero or positive, got {value}")]
    InvalidChaseDistance { field: &'static str, value: f64 },

    #[error("field of view must be within (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),

    #[error("precision of {0} decimal places exceeds what f64 can hold (max {max})", max = crate::interpolation::MAX_DECIMALS)]
    InvalidPrecision(u32),

    #[error("elevated line offset must be finite, got {0}")]
    InvalidLineOffset(f64),

    #[error("time extent start {start} is after end {end}")]
    InvalidExtent { start: f64, end: f64 },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Main error type for the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("render host error: {0}")]
    Host(#[from] HostError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trajectory_error_message() {
        let err = TrajectoryError::TooFewSamples {
            entity: EntityId::from("bird-1"),
            count: 1,
        };
        assert_eq!(
            err.to_string(),
            "trajectory bird-1 has 1 sample(s), need at least 2"
        );
        assert_eq!(err.entity().as_str(), "bird-1");
    }

    #[test]
    fn test_error_wraps_host_error() {
        let err: Error = HostError::view_unavailable("no camera").into();
        assert_eq!(
            err.to_string(),
            "render host error: ViewUnavailable: no camera"
        );
    }
}
