//! Chase camera: a pose placed behind and above a moving entity.

use crate::error::ConfigError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Camera pose handed to the render host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Camera position in scene coordinates
    pub position: Vector3<f64>,

    /// Compass bearing the camera looks along (degrees clockwise from north)
    pub heading: f64,

    /// Tilt from straight down, degrees (0 = nadir, 90 = horizon)
    pub tilt: f64,

    /// Field of view, degrees
    pub field_of_view: f64,
}

/// Fixed chase camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    /// Horizontal distance behind the entity (scene units)
    pub offset_distance: f64,

    /// Height above the entity (scene units)
    pub lift_height: f64,

    /// Camera tilt in degrees
    pub tilt: f64,

    /// Camera field of view in degrees
    pub field_of_view: f64,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            offset_distance: 150.0,
            lift_height: 60.0,
            tilt: 75.0,
            field_of_view: 55.0,
        }
    }
}

impl ChaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("offset_distance", self.offset_distance),
            ("lift_height", self.lift_height),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidChaseDistance { field, value });
            }
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(ConfigError::InvalidFieldOfView(self.field_of_view));
        }
        Ok(())
    }
}

/// Unit horizontal vector pointing along a compass bearing.
pub fn heading_vector(heading: f64) -> Vector3<f64> {
    let rad = heading.to_radians();
    Vector3::new(rad.sin(), rad.cos(), 0.0)
}

/// Places a camera `offset_distance` behind `position` (against `heading`)
/// and `lift_height` above it, looking the same way the entity moves.
pub fn plan(
    position: &Vector3<f64>,
    heading: f64,
    offset_distance: f64,
    lift_height: f64,
    tilt: f64,
    field_of_view: f64,
) -> CameraPose {
    let behind = -heading_vector(heading) * offset_distance;
    CameraPose {
        position: position + behind + Vector3::new(0.0, 0.0, lift_height),
        heading,
        tilt,
        field_of_view,
    }
}

/// [`plan`] bound to a [`ChaseConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaseCameraPlanner {
    config: ChaseConfig,
}

impl ChaseCameraPlanner {
    pub fn new(config: ChaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }

    pub fn plan(&self, position: &Vector3<f64>, heading: f64) -> CameraPose {
        plan(
            position,
            heading,
            self.config.offset_distance,
            self.config.lift_height,
            self.config.tilt,
            self.config.field_of_view,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_heading_east_puts_camera_west_and_above() {
        let entity = Vector3::new(100.0, 200.0, 30.0);
        let pose = plan(&entity, 90.0, 15.0, 10.0, 70.0, 50.0);

        assert_relative_eq!(pose.position.x, 85.0, epsilon = 1e-9);
        assert_relative_eq!(pose.position.y, 200.0, epsilon = 1e-9);
        assert_relative_eq!(pose.position.z, 40.0, epsilon = 1e-9);
        assert_eq!(pose.heading, 90.0);
        assert_eq!(pose.tilt, 70.0);
        assert_eq!(pose.field_of_view, 50.0);
    }

    #[test]
    fn test_heading_north_puts_camera_south() {
        let pose = plan(&Vector3::zeros(), 0.0, 20.0, 0.0, 60.0, 45.0);
        assert_relative_eq!(pose.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.position.y, -20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_horizontal_offset_is_exact_for_any_heading() {
        let entity = Vector3::new(-3.5, 1e6, 12.0);
        for step in 0..72 {
            let heading = step as f64 * 5.0 + 0.3;
            let pose = plan(&entity, heading, 37.0, 5.0, 60.0, 45.0);
            let offset = pose.position - entity;
            let horizontal = (offset.x * offset.x + offset.y * offset.y).sqrt();
            assert_relative_eq!(horizontal, 37.0, epsilon = 1e-6);
            assert_relative_eq!(offset.z, 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_planner_uses_config() {
        let planner = ChaseCameraPlanner::new(ChaseConfig {
            offset_distance: 15.0,
            lift_height: 10.0,
            tilt: 80.0,
            field_of_view: 60.0,
        });
        let pose = planner.plan(&Vector3::zeros(), 90.0);
        assert_relative_eq!(pose.position.x, -15.0, epsilon = 1e-9);
        assert_relative_eq!(pose.position.z, 10.0, epsilon = 1e-9);
        assert_eq!(pose.tilt, 80.0);
    }

    #[test]
    fn test_chase_config_validation() {
        assert!(ChaseConfig::default().validate().is_ok());

        let bad_offset = ChaseConfig {
            offset_distance: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_offset.validate(),
            Err(ConfigError::InvalidChaseDistance { field: "offset_distance", .. })
        ));

        let bad_fov = ChaseConfig {
            field_of_view: 180.0,
            ..Default::default()
        };
        assert_eq!(bad_fov.validate(), Err(ConfigError::InvalidFieldOfView(180.0)));
    }
}
