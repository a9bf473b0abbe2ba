//! Rerun.io render host.
//!
//! Logs every published frame to a Rerun recording:
//! - one line strip per entity trail, coloured by its binding
//! - a labelled marker at each live position
//! - the chase camera as a pinhole, when a frame carries one
//!
//! Enable with the `visualization` feature flag.

use crate::camera::CameraPose;
use crate::frame::Frame;
use crate::host::RenderHost;
use crate::style::{LineStyle, Rgba, TrailBinding};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use rerun::{RecordingStream, RecordingStreamBuilder};
use skytrail_env::{EntityId, HostError, HostStatus};
use std::collections::HashMap;

const MARKER_RADIUS: f32 = 4.0;
const CAMERA_ASPECT: f32 = 16.0 / 9.0;

fn rerun_error(e: impl std::fmt::Display) -> HostError {
    HostError::new("RerunError", e.to_string())
}

/// Scene coordinates to the `f32` triple Rerun expects, with the line
/// style's height rule applied.
fn scene_point(p: &Vector3<f64>, style: LineStyle) -> [f32; 3] {
    let z = style.render_height(p.z).unwrap_or(0.0);
    [p.x as f32, p.y as f32, z as f32]
}

/// Orientation of a camera in Rerun's RDF convention (x right, y down,
/// z forward) looking along `heading`, tilted `tilt` degrees up from nadir.
fn camera_rotation(pose: &CameraPose) -> UnitQuaternion<f64> {
    let (sin_h, cos_h) = pose.heading.to_radians().sin_cos();
    let (sin_t, cos_t) = pose.tilt.to_radians().sin_cos();

    let forward = Vector3::new(sin_h * sin_t, cos_h * sin_t, -cos_t);
    let right = Vector3::new(cos_h, -sin_h, 0.0);
    let down = forward.cross(&right);
    let basis = Matrix3::from_columns(&[right, down, forward]);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
}

pub struct RerunHost {
    rec: RecordingStream,
    status: HostStatus,
    bindings: HashMap<EntityId, TrailBinding>,
}

impl RerunHost {
    /// Spawns a Rerun viewer and logs to it.
    pub fn spawn(app_id: &str) -> Result<Self, HostError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .spawn()
            .map_err(rerun_error)?;
        Self::from_stream(rec)
    }

    /// Writes an `.rrd` file instead of spawning a viewer.
    pub fn save(app_id: &str, path: &str) -> Result<Self, HostError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .save(path)
            .map_err(rerun_error)?;
        Self::from_stream(rec)
    }

    fn from_stream(rec: RecordingStream) -> Result<Self, HostError> {
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())
            .map_err(rerun_error)?;

        let mut status = HostStatus::new();
        status.set_view_loaded();
        Ok(Self {
            rec,
            status,
            bindings: HashMap::new(),
        })
    }

    pub fn status(&self) -> &HostStatus {
        &self.status
    }

    fn binding(&self, entity: &EntityId) -> (Rgba, LineStyle) {
        self.bindings
            .get(entity)
            .map(|b| (b.color, b.style))
            .unwrap_or_default()
    }

    fn log_camera(&self, pose: &CameraPose) -> Result<(), HostError> {
        let q = camera_rotation(pose);
        let p = pose.position;
        self.rec
            .log(
                "world/camera",
                &rerun::Transform3D::from_translation_rotation(
                    [p.x as f32, p.y as f32, p.z as f32],
                    rerun::Quaternion::from_xyzw([q.i as f32, q.j as f32, q.k as f32, q.w as f32]),
                ),
            )
            .map_err(rerun_error)?;
        self.rec
            .log(
                "world/camera",
                &rerun::Pinhole::from_fov_and_aspect_ratio(
                    pose.field_of_view.to_radians() as f32,
                    CAMERA_ASPECT,
                ),
            )
            .map_err(rerun_error)
    }
}

impl RenderHost for RerunHost {
    fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    fn bind_trails(&mut self, bindings: &[TrailBinding]) -> Result<(), HostError> {
        self.bindings = bindings
            .iter()
            .map(|b| (b.entity_id.clone(), b.clone()))
            .collect();
        self.rec
            .log_static("world/trails", &rerun::Clear::recursive())
            .map_err(rerun_error)
    }

    fn present(&mut self, frame: &Frame) -> Result<(), HostError> {
        self.rec.set_time_sequence("frame", frame.sequence as i64);
        self.rec.set_time(
            "data_time",
            rerun::time::Timestamp::from_nanos_since_epoch((frame.time * 1e9) as i64),
        );

        for entity in &frame.entities {
            let (color, style) = self.binding(entity.entity_id());
            let path = format!("world/trails/{}", entity.entity_id());
            let strip: Vec<[f32; 3]> = entity.trail.iter().map(|p| scene_point(p, style)).collect();

            self.rec
                .log(
                    format!("{}/line", path),
                    &rerun::LineStrips3D::new([strip]).with_colors([color.0]),
                )
                .map_err(rerun_error)?;
            self.rec
                .log(
                    format!("{}/marker", path),
                    &rerun::Points3D::new([scene_point(entity.position(), style)])
                        .with_colors([color.0])
                        .with_radii([MARKER_RADIUS])
                        .with_labels([entity.entity_id().as_str()]),
                )
                .map_err(rerun_error)?;
        }

        if let Some(pose) = frame.camera.as_ref() {
            self.log_camera(pose)?;
        }
        Ok(())
    }
}
