//! SimWorld - the simulation harness container.

use crate::context::SimClock;
use crate::host::RecordingHost;
use crate::oracle::Oracle;

use skytrail_core::{
    AnimationController, ConfigError, Dataset, Frame, PlaybackConfig, RawTrack, RenderHost,
};
use skytrail_env::FrameClock;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of synthetic flights
    pub num_entities: usize,

    /// Length of each flight in data seconds
    pub flight_duration_secs: f64,

    /// Mean seconds between two recorded fixes
    pub mean_sample_interval_secs: f64,

    /// Altitude noise standard deviation (metres)
    pub altitude_noise_std: f64,

    /// Chance that a fix is recorded twice
    pub duplicate_probability: f64,

    /// Display frame rate in Hz
    pub frame_rate_hz: u32,

    pub playback: PlaybackConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_entities: 8,
            flight_duration_secs: 6.0 * 3_600.0,
            mean_sample_interval_secs: 120.0,
            altitude_noise_std: 0.0,
            duplicate_probability: 0.0,
            frame_rate_hz: 10,
            playback: PlaybackConfig::default(),
        }
    }
}

/// The SimWorld - oracle, dataset, virtual clock and controller in one place.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Virtual frame clock
    pub clock: SimClock,

    /// Ground truth oracle
    pub oracle: Oracle,

    /// Dataset handed to the controller
    pub dataset: Arc<Dataset>,

    /// Controller under test
    pub controller: AnimationController<RecordingHost>,
}

impl SimWorld {
    /// Builds a world with `config.num_entities` random flights.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Self::with_extra_tracks(config, Vec::new())
    }

    /// Like [`SimWorld::new`], with additional tracks appended to the load.
    pub fn with_extra_tracks(config: SimConfig, extra: Vec<RawTrack>) -> Result<Self, ConfigError> {
        // Physics seed kept apart from the master seed
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let mut oracle = Oracle::new(physics_seed);
        oracle.set_mean_interval(config.mean_sample_interval_secs);
        oracle.set_altitude_noise(config.altitude_noise_std);
        oracle.set_duplicate_probability(config.duplicate_probability);
        oracle.spawn_random_flights(config.num_entities, config.flight_duration_secs);

        let mut tracks = oracle.sample_all();
        tracks.extend(extra);
        let dataset = Arc::new(Dataset::from_raw(tracks));

        Self::from_parts(config, oracle, dataset)
    }

    /// Wraps an existing dataset (e.g. ingested CSV) with an empty oracle.
    pub fn from_dataset(config: SimConfig, dataset: Arc<Dataset>) -> Result<Self, ConfigError> {
        let oracle = Oracle::new(config.seed);
        Self::from_parts(config, oracle, dataset)
    }

    fn from_parts(
        config: SimConfig,
        oracle: Oracle,
        dataset: Arc<Dataset>,
    ) -> Result<Self, ConfigError> {
        let clock = SimClock::from_hz(config.frame_rate_hz);
        let mut controller =
            AnimationController::new(RecordingHost::ready(), config.playback.clone())?;
        controller.load_dataset(Arc::clone(&dataset));

        Ok(Self {
            config,
            clock,
            oracle,
            dataset,
            controller,
        })
    }

    /// One display frame: advance the virtual clock, then tick.
    pub fn step(&mut self) -> Option<Frame> {
        let frame_no = self.clock.advance_frame()?;
        let frame = self.controller.tick();
        if frame_no % 100 == 0 {
            debug!(
                "  frame={} | t={:.0} | published={}",
                frame_no,
                self.controller.current_time(),
                frame.is_some()
            );
        }
        frame
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.frames()
    }
}

/// Drives `controller` from `clock` until the clock stops or `max_frames`
/// frames have been handed out. Returns the number of frames published.
pub async fn drive<C, H>(
    controller: &mut AnimationController<H>,
    clock: &C,
    max_frames: u64,
    mut on_frame: impl FnMut(&Frame),
) -> u64
where
    C: FrameClock,
    H: RenderHost,
{
    let mut published = 0;
    while let Some(frame_no) = clock.next_frame().await {
        if frame_no >= max_frames {
            break;
        }
        if let Some(frame) = controller.tick() {
            on_frame(&frame);
            published += 1;
        }
    }
    published
}
