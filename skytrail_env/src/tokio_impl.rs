//! Production implementation of FrameClock using Tokio.

use crate::FrameClock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Production frame clock backed by a Tokio interval.
///
/// Missed frames are skipped rather than bursted, matching how a display
/// refresh callback behaves when a frame takes too long.
pub struct TokioFrameClock {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Nominal frame period
    period: Duration,

    /// The underlying timer (needs `&mut` to tick)
    ticker: Mutex<Interval>,

    /// Number of frames handed out so far
    frames: AtomicU64,

    /// Set once `stop()` is called
    stopped: AtomicBool,
}

impl TokioFrameClock {
    /// Creates a new clock firing every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            start: Instant::now(),
            period,
            ticker: Mutex::new(ticker),
            frames: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    /// Creates a clock from a frame rate in Hz.
    pub fn from_hz(hz: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / hz.max(1) as f64))
    }

    /// Creates an Arc-wrapped clock for sharing across tasks.
    pub fn shared(period: Duration) -> Arc<Self> {
        Arc::new(Self::new(period))
    }

    /// Stops handing out frames; pending and later `next_frame` calls return `None`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameClock for TokioFrameClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn frame_period(&self) -> Duration {
        self.period
    }

    async fn next_frame(&self) -> Option<u64> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        self.ticker.lock().await.tick().await;
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.frames.fetch_add(1, Ordering::SeqCst))
    }
}
