//! Headless render host that records what it is asked to draw.

use skytrail_core::{Frame, RenderHost, TrailBinding};
use skytrail_env::{HostError, HostStatus};

/// Keeps every binding and frame for later inspection.
///
/// Readiness follows the embedded [`HostStatus`]: the host is ready once its
/// view is marked loaded and no error is pending.
#[derive(Debug, Default)]
pub struct RecordingHost {
    status: HostStatus,
    bindings: Vec<TrailBinding>,
    frames: Vec<Frame>,

    /// Only keep the newest frame (long runs)
    keep_latest_only: bool,

    /// Errors returned by the next `present` calls, oldest first
    injected: Vec<HostError>,

    /// Frames that carried a camera pose
    camera_moves: u64,
}

impl RecordingHost {
    /// A host whose view is already loaded.
    pub fn ready() -> Self {
        let mut host = Self::default();
        host.status.set_view_loaded();
        host
    }

    pub fn keep_latest_only(mut self) -> Self {
        self.keep_latest_only = true;
        self
    }

    pub fn status(&self) -> &HostStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut HostStatus {
        &mut self.status
    }

    /// Makes the next `present` fail with `error`.
    pub fn inject_error(&mut self, error: HostError) {
        self.injected.push(error);
    }

    pub fn bindings(&self) -> &[TrailBinding] {
        &self.bindings
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn camera_moves(&self) -> u64 {
        self.camera_moves
    }
}

impl RenderHost for RecordingHost {
    fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    fn bind_trails(&mut self, bindings: &[TrailBinding]) -> Result<(), HostError> {
        self.bindings = bindings.to_vec();
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), HostError> {
        if !self.injected.is_empty() {
            return Err(self.injected.remove(0));
        }
        if frame.camera.is_some() {
            self.camera_moves += 1;
        }
        if self.keep_latest_only {
            self.frames.clear();
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}
