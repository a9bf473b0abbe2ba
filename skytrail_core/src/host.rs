//! The seam between the engine and whatever draws the scene.

use crate::frame::Frame;
use crate::style::TrailBinding;
use skytrail_env::HostError;

/// A scene host that can draw trails, entity markers and a camera.
///
/// The controller receives its host at construction; there is no global
/// view to look up.
///
/// # Implementations
///
/// - **Harness**: `RecordingHost` (in `skytrail_sim`) - keeps every frame
/// - **Rerun**: `RerunHost` (feature `visualization`) - logs to a Rerun viewer
pub trait RenderHost {
    /// Whether the host can draw yet (view loaded, no pending error).
    ///
    /// The controller publishes nothing while this is false.
    fn is_ready(&self) -> bool {
        true
    }

    /// Called once per dataset load with each entity's resolved trail style.
    fn bind_trails(&mut self, bindings: &[TrailBinding]) -> Result<(), HostError>;

    /// Draws one frame. A frame without a camera pose must leave the
    /// camera where it is.
    fn present(&mut self, frame: &Frame) -> Result<(), HostError>;
}

impl<H: RenderHost + ?Sized> RenderHost for Box<H> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn bind_trails(&mut self, bindings: &[TrailBinding]) -> Result<(), HostError> {
        (**self).bind_trails(bindings)
    }

    fn present(&mut self, frame: &Frame) -> Result<(), HostError> {
        (**self).present(frame)
    }
}
