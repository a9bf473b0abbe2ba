//! Frame clock trait - the render host's "draw a new frame now" callback.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for frame scheduling.
///
/// The render host owns the render loop; the playback engine only reacts to
/// the frames it is handed. This trait abstracts that callback so the same
/// driver loop runs against a real timer (tokio) or a virtual clock in the
/// simulation harness.
///
/// # Implementations
///
/// - **Production**: `TokioFrameClock` - wraps `tokio::time::interval`
/// - **Simulation**: `SimClock` (in `skytrail_sim`) - virtual time, advanced per frame
///
/// # Cancellation
///
/// A frame that has been handed out is not queued again: callers decide at
/// the top of every frame whether there is work to do.
#[async_trait]
pub trait FrameClock: Send + Sync + 'static {
    /// Returns the monotonic time since the clock was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// The nominal period between two frames.
    fn frame_period(&self) -> Duration;

    /// Waits for the next frame and returns its sequence number.
    ///
    /// # Returns
    /// * `Some(n)` - frame `n` should be rendered now
    /// * `None` - the host stopped scheduling frames (shutdown)
    async fn next_frame(&self) -> Option<u64>;
}
