//! Virtual frame clock for deterministic replay.

use async_trait::async_trait;
use skytrail_env::FrameClock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frame clock backed by virtual time.
///
/// Every frame advances the clock by exactly one period and returns
/// immediately, so a run of N frames is reproducible and takes no wall time.
/// Clones share the same time and frame counter.
#[derive(Clone)]
pub struct SimClock {
    /// Nominal frame period
    period: Duration,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,

    /// Frames handed out so far
    frames: Arc<AtomicU64>,

    /// Stop after this many frames (None = unlimited)
    frame_limit: Option<u64>,
}

impl SimClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            frames: Arc::new(AtomicU64::new(0)),
            frame_limit: None,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        Self::new(Duration::from_nanos(1_000_000_000 / hz.max(1) as u64))
    }

    /// Hands out at most `limit` frames, then reports shutdown.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared(period: Duration) -> Arc<Self> {
        Arc::new(Self::new(period))
    }

    /// Advances virtual time by one period and returns the frame number.
    pub fn advance_frame(&self) -> Option<u64> {
        let frame = self.frames.load(Ordering::SeqCst);
        if self.frame_limit.is_some_and(|limit| frame >= limit) {
            return None;
        }
        self.frames.fetch_add(1, Ordering::SeqCst);
        self.virtual_time_ns
            .fetch_add(self.period.as_nanos() as u64, Ordering::SeqCst);
        Some(frame)
    }

    /// Number of frames handed out so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameClock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.virtual_time_ns.load(Ordering::SeqCst))
    }

    fn frame_period(&self) -> Duration {
        self.period
    }

    async fn next_frame(&self) -> Option<u64> {
        self.advance_frame()
    }
}
