//! Scenario runner - executes replay scenarios against ground truth.

use crate::host::RecordingHost;
use crate::oracle::Oracle;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use skytrail_core::{
    AnimationController, ConfigError, Dataset, EntityId, Frame, PlaybackConfig, Precision,
    TimeExtent,
};
use skytrail_env::HostError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Horizontal error allowed against the analytic flight path (metres).
const POSITION_TOLERANCE: f64 = 1e-6;

/// Heading error allowed against the analytic flight bearing (degrees).
const HEADING_TOLERANCE: f64 = 1e-3;

/// Turning, perching track added to the scrub storm.
const DOGLEG_ID: &str = "dogleg";

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total display frames executed
    pub total_ticks: u64,

    /// Playback time at the end of the run
    pub final_time_secs: f64,

    /// Number of entities loaded
    pub final_entity_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

fn serialize_scenario<S: serde::Serializer>(id: &ScenarioId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.name())
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Frames the controller published
    pub frames_published: u64,

    /// Times playback wrapped back to the extent start
    pub loops: u64,

    /// Random scrubs performed
    pub scrubs: u64,

    /// Largest horizontal distance from ground truth (metres)
    pub max_position_error: f64,

    /// Largest heading difference from ground truth (degrees)
    pub max_heading_error: f64,

    /// Tracks the dataset refused
    pub rejected_tracks: usize,

    /// Entity frames whose trail held only the live point
    pub empty_windows: u64,

    /// Frames that carried a chase camera pose
    pub camera_poses: u64,

    /// Host errors captured by the controller
    pub host_errors: u64,
}

/// Smallest angle between two compass bearings.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Structural checks every published frame must pass.
pub fn check_frame(frame: &Frame, dataset: &Dataset, config: &PlaybackConfig) -> Result<(), String> {
    // Rounded output may sit half a unit outside the segment
    let slack = match config.precision {
        Precision::Full => 0.0,
        Precision::Decimals(places) => 0.5 * 10f64.powi(-(places as i32)) + 1e-9,
    };
    for entity in &frame.entities {
        let id = entity.entity_id();
        let traj = dataset
            .get(id)
            .ok_or_else(|| format!("frame {} has unknown entity {}", frame.sequence, id))?;

        if entity.trail.last() != Some(entity.position()) {
            return Err(format!("{}: trail does not end at the live position", id));
        }

        let i = entity.state.segment_index;
        if i + 1 >= traj.len() {
            return Err(format!("{}: segment {} out of range", id, i));
        }
        let a = traj.sample(i).position;
        let b = traj.sample(i + 1).position;
        for axis in 0..3 {
            let p = entity.position()[axis];
            if p < a[axis].min(b[axis]) - slack || p > a[axis].max(b[axis]) + slack {
                return Err(format!(
                    "{}: position leaves segment {} bounds at t={}",
                    id, i, frame.time
                ));
            }
        }

        let window = config.window_for(id);
        match entity.window {
            Some(w) => {
                if entity.trail.len() != w.sample_count() + 1 {
                    return Err(format!("{}: trail length disagrees with window", id));
                }
                for k in w.start_index..=w.end_index {
                    let s = traj.sample(k).t;
                    if s > frame.time || (window > 0.0 && s < frame.time - window) {
                        return Err(format!(
                            "{}: sample {} (t={}) outside window at t={}",
                            id, k, s, frame.time
                        ));
                    }
                }
            }
            None if entity.trail.len() != 1 => {
                return Err(format!("{}: empty window but trail has stored points", id));
            }
            None => {}
        }
    }
    Ok(())
}

/// Compares every entity that has a ground truth flight.
pub fn check_truth(
    frame: &Frame,
    oracle: &Oracle,
    metrics: &mut ScenarioMetrics,
) -> Result<(), String> {
    for entity in &frame.entities {
        let Some(flight) = oracle.flight(entity.entity_id()) else {
            continue;
        };
        let truth = flight.position_at(frame.time);
        let p = entity.position();
        let error = (p.x - truth.x).hypot(p.y - truth.y);
        metrics.max_position_error = metrics.max_position_error.max(error);
        if error > POSITION_TOLERANCE {
            return Err(format!(
                "{}: {:.3e} m from ground truth at t={}",
                flight.id, error, frame.time
            ));
        }

        match (entity.heading(), flight.heading()) {
            (Some(heading), Some(expected)) => {
                let diff = heading_difference(heading, expected);
                metrics.max_heading_error = metrics.max_heading_error.max(diff);
                if diff > HEADING_TOLERANCE {
                    return Err(format!(
                        "{}: heading {:.4} vs truth {:.4} at t={}",
                        flight.id, heading, expected, frame.time
                    ));
                }
            }
            (None, Some(_)) => {
                return Err(format!("{}: no heading at t={}", flight.id, frame.time));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Runs replay scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of synthetic flights
    num_entities: usize,

    /// Display frames per scenario
    frames: u64,

    /// Base playback configuration (scenarios adjust step and window)
    playback: PlaybackConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_entities: usize) -> Self {
        Self {
            seed,
            num_entities,
            frames: 300,
            playback: PlaybackConfig::default(),
        }
    }

    /// Sets the number of display frames per scenario.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = frames;
        self
    }

    /// Sets the base playback configuration.
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    fn sim_config(&self) -> SimConfig {
        SimConfig {
            seed: self.seed,
            num_entities: self.num_entities,
            playback: self.playback.clone(),
            ..Default::default()
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let outcome = match scenario {
            ScenarioId::SteadyReplay => self.run_steady_replay(),
            ScenarioId::ScrubStorm => self.run_scrub_storm(),
            ScenarioId::LoopWrap => self.run_loop_wrap(),
            ScenarioId::SparseSampling => self.run_sparse_sampling(),
            ScenarioId::DegenerateData => self.run_degenerate_data(),
            ScenarioId::ChaseCam => self.run_chase_cam(),
        };

        match outcome {
            Ok(run) => run.into_result(scenario, self.seed),
            Err(e) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                total_ticks: 0,
                final_time_secs: 0.0,
                final_entity_count: 0,
                failure_reason: Some(format!("invalid configuration: {}", e)),
                metrics: ScenarioMetrics::default(),
            },
        }
    }

    /// SKY-001: SteadyReplay - forward playback over clean flights.
    ///
    /// **Assertion**: every frame matches ground truth and no entity's
    /// segment index decreases between consecutive frames.
    fn run_steady_replay(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.playback.step_seconds = 60.0;
        config.playback.trail_window_seconds = 1_800.0;
        let mut world = SimWorld::new(config)?;
        let mut run = Run::new(&world);
        world.controller.play();

        let mut last_index: HashMap<String, usize> = HashMap::new();
        let mut previous_time = world.controller.current_time();
        for _ in 0..self.frames {
            let Some(frame) = world.step() else {
                continue;
            };
            run.observe(&frame, &world);
            if let Err(reason) = check_frame(&frame, &world.dataset, world.controller.config())
                .and_then(|_| check_truth(&frame, &world.oracle, &mut run.metrics))
            {
                return Ok(run.fail(reason));
            }

            let wrapped = frame.time < previous_time;
            if wrapped {
                last_index.clear();
            }
            for entity in &frame.entities {
                let index = entity.state.segment_index;
                let previous = last_index.insert(entity.entity_id().to_string(), index);
                if previous.is_some_and(|p| index < p) {
                    return Ok(run.fail(format!(
                        "{}: segment index went back under forward play",
                        entity.entity_id()
                    )));
                }
            }
            previous_time = frame.time;
        }
        Ok(run.finish(&world))
    }

    /// SKY-002: ScrubStorm - random scrubs interleaved with playback.
    ///
    /// A turning, perching track rides along and is followed, so ticks that
    /// jump over turns onto a perch must still agree on the heading.
    ///
    /// **Assertion**: whatever the history, a frame equals what a fresh
    /// controller produces by scrubbing straight to the same time.
    fn run_scrub_storm(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.playback.step_seconds = 90.0;
        config.playback.trail_window_seconds = 3_600.0;

        let mut scratch = Oracle::new(self.seed ^ 0xd061e9);
        let dogleg = scratch.dogleg_track(DOGLEG_ID, config.flight_duration_secs);
        let mut world = SimWorld::with_extra_tracks(config, vec![dogleg])?;
        let mut run = Run::new(&world);

        let mut reference =
            AnimationController::new(RecordingHost::ready(), world.controller.config().clone())?;
        reference.load_dataset(Arc::clone(&world.dataset));
        world.controller.set_follow(Some(EntityId::from(DOGLEG_ID)));
        reference.set_follow(Some(EntityId::from(DOGLEG_ID)));

        let Some(extent) = world.dataset.extent() else {
            return Ok(run.fail("dataset is empty".to_string()));
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0x5c0b);
        world.controller.play();

        for k in 0..self.frames {
            let frame = if k % 3 == 0 {
                run.metrics.scrubs += 1;
                let t = rng.gen_range(extent.start - 600.0..extent.end + 600.0);
                world.controller.scrub_to(t)
            } else {
                world.step()
            };
            let Some(frame) = frame else {
                continue;
            };
            run.observe(&frame, &world);

            if let Err(reason) = check_frame(&frame, &world.dataset, world.controller.config()) {
                return Ok(run.fail(reason));
            }
            let Some(expected) = reference.scrub_to(frame.time) else {
                return Ok(run.fail("reference controller published nothing".to_string()));
            };
            if expected.entities != frame.entities || expected.camera != frame.camera {
                return Ok(run.fail(format!(
                    "frame {} at t={} differs from a direct scrub",
                    frame.sequence, frame.time
                )));
            }
        }
        Ok(run.finish(&world))
    }

    /// SKY-003: LoopWrap - play through the end of the extent repeatedly.
    ///
    /// **Assertion**: time never leaves the extent and every backward jump
    /// lands exactly on its start.
    fn run_loop_wrap(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.flight_duration_secs = 3_600.0;
        let mut world = SimWorld::new(config)?;
        let Some(extent) = world.dataset.extent() else {
            return Ok(Run::new(&world).fail("dataset is empty".to_string()));
        };

        // About seven and a half steps per loop
        world.controller.set_step(extent.duration() / 7.5)?;
        let mut run = Run::new(&world);
        world.controller.play();

        let mut previous = world.controller.current_time();
        for _ in 0..self.frames {
            let Some(frame) = world.step() else {
                continue;
            };
            run.observe(&frame, &world);
            if !extent.contains(frame.time) {
                return Ok(run.fail(format!("time {} left the extent", frame.time)));
            }
            if frame.time < previous && frame.time != extent.start {
                return Ok(run.fail(format!("wrapped to {} instead of the start", frame.time)));
            }
            if let Err(reason) = check_frame(&frame, &world.dataset, world.controller.config())
                .and_then(|_| check_truth(&frame, &world.oracle, &mut run.metrics))
            {
                return Ok(run.fail(reason));
            }
            previous = frame.time;
        }

        if self.frames >= 16 && run.metrics.loops == 0 {
            return Ok(run.fail("playback never wrapped".to_string()));
        }
        Ok(run.finish(&world))
    }

    /// SKY-004: SparseSampling - hour-scale gaps, half-hour trail window.
    ///
    /// **Assertion**: windows only hold in-range samples, and a window with
    /// nothing in range degrades to the live point.
    fn run_sparse_sampling(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.flight_duration_secs = 24.0 * 3_600.0;
        config.mean_sample_interval_secs = 3_600.0;
        config.playback.step_seconds = 600.0;
        config.playback.trail_window_seconds = 1_800.0;
        let mut world = SimWorld::new(config)?;
        let mut run = Run::new(&world);
        world.controller.play();

        for _ in 0..self.frames {
            let Some(frame) = world.step() else {
                continue;
            };
            run.observe(&frame, &world);
            if let Err(reason) = check_frame(&frame, &world.dataset, world.controller.config())
                .and_then(|_| check_truth(&frame, &world.oracle, &mut run.metrics))
            {
                return Ok(run.fail(reason));
            }
        }
        Ok(run.finish(&world))
    }

    /// SKY-005: DegenerateData - broken tracks, duplicates, noise, host faults.
    ///
    /// **Assertion**: exactly the broken tracks are rejected, the rest play
    /// with a heading on every frame, and a host error is captured without
    /// stopping playback.
    fn run_degenerate_data(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.altitude_noise_std = 5.0;
        config.duplicate_probability = 0.2;
        config.playback.step_seconds = 120.0;

        let mut scratch = Oracle::new(self.seed);
        let extra = vec![
            scratch.single_sample_track("lonely-fix"),
            scratch.unordered_track("shuffled"),
        ];
        let mut world = SimWorld::with_extra_tracks(config, extra)?;
        let mut run = Run::new(&world);

        if world.dataset.rejected().len() != 2 || world.dataset.len() != self.num_entities {
            return Ok(run.fail(format!(
                "expected 2 rejected and {} loaded, got {} and {}",
                self.num_entities,
                world.dataset.rejected().len(),
                world.dataset.len()
            )));
        }

        world.controller.play();
        world
            .controller
            .host_mut()
            .inject_error(HostError::view_unavailable("scene view lost"));

        for _ in 0..self.frames {
            let Some(frame) = world.step() else {
                continue;
            };
            run.observe(&frame, &world);
            if let Err(reason) = check_frame(&frame, &world.dataset, world.controller.config())
                .and_then(|_| check_truth(&frame, &world.oracle, &mut run.metrics))
            {
                return Ok(run.fail(reason));
            }
            if world.controller.last_error().is_some() {
                run.metrics.host_errors += 1;
                world.controller.clear_error();
            }
        }

        if self.frames > 0 && run.metrics.host_errors != 1 {
            let reason = format!(
                "expected one captured host error, saw {}",
                run.metrics.host_errors
            );
            return Ok(run.fail(reason));
        }
        Ok(run.finish(&world))
    }

    /// SKY-006: ChaseCam - camera follows the first flight.
    ///
    /// **Assertion**: every frame carries a pose at the configured distance
    /// behind and above the entity, looking along its true heading; releasing
    /// the follow target removes the pose.
    fn run_chase_cam(&self) -> Result<Run, ConfigError> {
        let mut config = self.sim_config();
        config.playback.step_seconds = 60.0;
        let mut world = SimWorld::new(config)?;
        let mut run = Run::new(&world);

        let Some(target) = world.oracle.flights().first().map(|f| f.id.clone()) else {
            return Ok(run.fail("no flight to follow".to_string()));
        };
        world.controller.set_follow(Some(target.clone()));
        world.controller.play();
        let chase = world.controller.config().chase;

        for _ in 0..self.frames {
            let Some(frame) = world.step() else {
                continue;
            };
            run.observe(&frame, &world);

            let (Some(camera), Some(entity)) = (frame.camera, frame.entity(&target)) else {
                return Ok(run.fail(format!("frame {} has no camera pose", frame.sequence)));
            };
            let offset = camera.position - entity.position();
            let horizontal = offset.x.hypot(offset.y);
            if (horizontal - chase.offset_distance).abs() > 1e-6
                || (offset.z - chase.lift_height).abs() > 1e-6
            {
                return Ok(run.fail(format!(
                    "camera offset ({:.3}, {:.3}) at t={}",
                    horizontal, offset.z, frame.time
                )));
            }
            if let Err(reason) = check_truth(&frame, &world.oracle, &mut run.metrics) {
                return Ok(run.fail(reason));
            }
            if let Some(truth) = world.oracle.flight(&target).and_then(|f| f.heading()) {
                if heading_difference(camera.heading, truth) > HEADING_TOLERANCE {
                    return Ok(run.fail(format!("camera heading {:.3}", camera.heading)));
                }
            }
        }

        world.controller.set_follow(None);
        if world.controller.refresh().is_some_and(|f| f.camera.is_some()) {
            return Ok(run.fail("camera pose after releasing the target".to_string()));
        }
        Ok(run.finish(&world))
    }
}

/// Book-keeping shared by all scenarios.
struct Run {
    metrics: ScenarioMetrics,
    entity_count: usize,
    extent: Option<TimeExtent>,
    last_time: Option<f64>,
    final_time: f64,
    total_ticks: u64,
    failure: Option<String>,
}

impl Run {
    fn new(world: &SimWorld) -> Self {
        Self {
            metrics: ScenarioMetrics {
                rejected_tracks: world.dataset.rejected().len(),
                ..Default::default()
            },
            entity_count: world.dataset.len(),
            extent: world.controller.extent(),
            last_time: None,
            final_time: world.controller.current_time(),
            total_ticks: world.tick_count(),
            failure: None,
        }
    }

    fn observe(&mut self, frame: &Frame, world: &SimWorld) {
        self.metrics.frames_published += 1;
        if frame.camera.is_some() {
            self.metrics.camera_poses += 1;
        }
        self.metrics.empty_windows += frame
            .entities
            .iter()
            .filter(|e| e.window.is_none())
            .count() as u64;

        let wrapped = match (self.last_time, self.extent) {
            (Some(previous), Some(extent)) => frame.time < previous && frame.time == extent.start,
            _ => false,
        };
        if wrapped {
            self.metrics.loops += 1;
        }
        self.last_time = Some(frame.time);
        self.final_time = frame.time;
        self.total_ticks = world.tick_count();
    }

    fn fail(mut self, reason: String) -> Self {
        self.failure = Some(reason);
        self
    }

    fn finish(mut self, world: &SimWorld) -> Self {
        self.total_ticks = world.tick_count();
        self.final_time = world.controller.current_time();
        self
    }

    fn into_result(self, scenario: ScenarioId, seed: u64) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed,
            passed: self.failure.is_none(),
            total_ticks: self.total_ticks,
            final_time_secs: self.final_time,
            final_entity_count: self.entity_count,
            failure_reason: self.failure,
            metrics: self.metrics,
        }
    }
}
