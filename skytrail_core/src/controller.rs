//! Animation controller: owns the playback cursor and drives the host.
//!
//! The controller is a single-owner state machine. A frame clock (or a
//! test) calls [`AnimationController::tick`]; user actions call
//! [`play`](AnimationController::play), [`pause`](AnimationController::pause),
//! [`scrub_to`](AnimationController::scrub_to) and
//! [`set_follow`](AnimationController::set_follow). Every published
//! [`Frame`] is computed for one query time across all entities.
//!
//! Per entity it keeps a [`SegmentCursor`] and a [`WindowTrimmer`] so that
//! forward playback costs amortised O(1) per entity per tick. Any backward
//! jump (scrub or loop wrap) resets both.

use crate::camera::ChaseCameraPlanner;
use crate::config::{check_step, check_window, PlaybackConfig};
use crate::error::ConfigError;
use crate::frame::{EntityFrame, Frame, InterpolatedState};
use crate::host::RenderHost;
use crate::interpolation::{interpolate, segment_heading, Precision};
use crate::locator::SegmentCursor;
use crate::style::bind_trails;
use crate::trail::WindowTrimmer;
use crate::trajectory::{Dataset, TimeExtent, Trajectory};
use serde::{Deserialize, Serialize};
use skytrail_env::{EntityId, HostError};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

/// Whether the camera chases an entity, and which one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowState {
    pub following: bool,
    pub target: Option<EntityId>,
}

impl FollowState {
    /// The entity to chase right now, if any.
    pub fn active_target(&self) -> Option<&EntityId> {
        if self.following {
            self.target.as_ref()
        } else {
            None
        }
    }
}

/// Incremental lookup state for one entity.
#[derive(Debug, Clone, Default)]
struct EntityTracker {
    cursor: SegmentCursor,
    trimmer: WindowTrimmer,
    /// Latest segment seen so far that moves horizontally, with its heading
    last_moving: Option<(usize, f64)>,
    /// Segments below this index have been inspected for movement
    scanned: usize,
}

impl EntityTracker {
    fn reset(&mut self) {
        self.cursor.reset();
        self.trimmer.reset();
        self.last_moving = None;
        self.scanned = 0;
    }

    /// Heading at segment `i`, always equal to `heading_at_or_before(i)`.
    ///
    /// Segments are inspected once each between resets, so a tick that
    /// jumps several segments still sees turns it skipped.
    fn heading(&mut self, trajectory: &Trajectory, i: usize, own: Option<f64>) -> Option<f64> {
        if let Some(heading) = own {
            self.last_moving = Some((i, heading));
            self.scanned = self.scanned.max(i + 1);
            return Some(heading);
        }
        if self.last_moving.is_some_and(|(k, _)| k > i) {
            self.last_moving = None;
            self.scanned = 0;
        }
        let from = self.scanned.min(i);
        if let Some(found) = (from..i)
            .rev()
            .find_map(|j| segment_heading(trajectory, j).map(|h| (j, h)))
        {
            self.last_moving = Some(found);
        }
        self.scanned = self.scanned.max(i + 1);
        self.last_moving.map(|(_, heading)| heading)
    }

    fn advance(
        &mut self,
        trajectory: &Trajectory,
        t: f64,
        window: f64,
        precision: Precision,
    ) -> EntityFrame {
        let i = self.cursor.seek(trajectory, t);
        let (raw, own_heading) = interpolate(trajectory, i, t);

        // Stationary segments keep the heading of the last one that moved
        let heading = self.heading(trajectory, i, own_heading);

        let position = precision.apply(raw);
        let (window, trail) = self.trimmer.trim(trajectory, i, window, t, position);

        EntityFrame {
            state: InterpolatedState {
                entity_id: trajectory.entity_id().clone(),
                position,
                heading,
                segment_index: i,
            },
            window,
            trail,
        }
    }
}

pub struct AnimationController<H: RenderHost> {
    host: H,
    config: PlaybackConfig,
    planner: ChaseCameraPlanner,
    dataset: Option<Arc<Dataset>>,
    extent: Option<TimeExtent>,
    trackers: Vec<EntityTracker>,
    time: f64,
    state: PlaybackState,
    follow: FollowState,
    sequence: u64,
    last_error: Option<HostError>,
}

impl<H: RenderHost> AnimationController<H> {
    /// Creates a paused controller with no data.
    pub fn new(host: H, config: PlaybackConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let time = config.time_extent.map_or(0.0, |e| e.start);
        Ok(Self {
            host,
            planner: ChaseCameraPlanner::new(config.chase),
            config,
            dataset: None,
            extent: None,
            trackers: Vec::new(),
            time,
            state: PlaybackState::Paused,
            follow: FollowState::default(),
            sequence: 0,
            last_error: None,
        })
    }

    /// Swaps in a new dataset, binds its trails and rewinds to the start.
    ///
    /// Play state and follow target are kept. A host that fails to bind the
    /// trails has its error recorded; the dataset is still loaded.
    pub fn load_dataset(&mut self, dataset: Arc<Dataset>) {
        self.extent = self.config.time_extent.or_else(|| dataset.extent());
        self.trackers = vec![EntityTracker::default(); dataset.len()];
        if let Some(extent) = self.extent {
            self.time = extent.start;
        }

        info!(
            "Loaded {} trajectories ({} rejected), extent {:?}",
            dataset.len(),
            dataset.rejected().len(),
            self.extent
        );

        let bindings = bind_trails(&dataset, self.config.default_color, self.config.line_style);
        if let Err(e) = self.host.bind_trails(&bindings) {
            self.record_error(e);
        }

        if let Some(target) = self.follow.target.as_ref() {
            if dataset.get(target).is_none() {
                warn!("Follow target {} is not in the new dataset", target);
            }
        }
        self.dataset = Some(dataset);
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Playback extent: the config override, else the dataset's.
    pub fn extent(&self) -> Option<TimeExtent> {
        self.extent
    }

    pub fn current_time(&self) -> f64 {
        self.time
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn play(&mut self) {
        if self.state != PlaybackState::Playing {
            debug!("Playback started at t={}", self.time);
            self.state = PlaybackState::Playing;
        }
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Paused {
            debug!("Playback paused at t={}", self.time);
            self.state = PlaybackState::Paused;
        }
    }

    pub fn toggle_play(&mut self) -> PlaybackState {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
        }
        self.state
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn set_step(&mut self, step_seconds: f64) -> Result<(), ConfigError> {
        check_step(step_seconds)?;
        self.config.step_seconds = step_seconds;
        Ok(())
    }

    /// Changes the default trail window; takes effect on the next frame.
    pub fn set_trail_window(&mut self, seconds: f64) -> Result<(), ConfigError> {
        check_window(seconds)?;
        self.config.trail_window_seconds = seconds;
        Ok(())
    }

    pub fn follow(&self) -> &FollowState {
        &self.follow
    }

    /// Chase `target`, or stop chasing with `None`.
    ///
    /// An id that is not in the loaded dataset is accepted but produces no
    /// camera pose.
    pub fn set_follow(&mut self, target: Option<EntityId>) {
        match target {
            Some(id) => {
                if let Some(dataset) = self.dataset.as_ref() {
                    if dataset.get(&id).is_none() {
                        warn!("Follow target {} is not in the dataset", id);
                    }
                }
                debug!("Following {}", id);
                self.follow = FollowState {
                    following: true,
                    target: Some(id),
                };
            }
            None => {
                debug!("Camera released");
                self.follow = FollowState::default();
            }
        }
    }

    /// Flips following on or off, keeping the chosen target.
    pub fn toggle_follow(&mut self) -> bool {
        self.follow.following = !self.follow.following && self.follow.target.is_some();
        self.follow.following
    }

    /// Advances one step and publishes, wrapping to the start past the end.
    ///
    /// Returns `None` without touching the cursor while paused, before a
    /// dataset is loaded, or while the host is not ready.
    pub fn tick(&mut self) -> Option<Frame> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let extent = self.ready_extent()?;

        let next = self.time + self.config.step_seconds;
        if next > extent.end {
            debug!("Looping from t={} back to {}", self.time, extent.start);
            self.time = extent.start;
            self.reset_trackers();
        } else {
            self.time = next;
        }
        self.publish()
    }

    /// Jumps to `t` and publishes immediately, whatever the play state.
    ///
    /// `t` is not clamped: before the first sample entities hold their first
    /// position, after the last they hold their final one.
    pub fn scrub_to(&mut self, t: f64) -> Option<Frame> {
        if !t.is_finite() {
            warn!("Ignoring scrub to non-finite time {}", t);
            return None;
        }
        self.time = t;
        self.reset_trackers();
        self.ready_extent()?;
        self.publish()
    }

    /// Republishes the current time without advancing.
    pub fn refresh(&mut self) -> Option<Frame> {
        self.ready_extent()?;
        self.publish()
    }

    /// Most recent host failure, kept until cleared.
    pub fn last_error(&self) -> Option<&HostError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    fn ready_extent(&self) -> Option<TimeExtent> {
        if self.dataset.is_none() || !self.host.is_ready() {
            return None;
        }
        self.extent
    }

    fn reset_trackers(&mut self) {
        for tracker in &mut self.trackers {
            tracker.reset();
        }
    }

    fn record_error(&mut self, error: HostError) {
        warn!("Render host error: {}", error);
        self.last_error = Some(error);
    }

    fn compute(&mut self) -> Option<Frame> {
        let dataset = Arc::clone(self.dataset.as_ref()?);
        let t = self.time;
        let config = &self.config;

        let entities: Vec<EntityFrame> = dataset
            .trajectories()
            .iter()
            .zip(self.trackers.iter_mut())
            .map(|(traj, tracker)| {
                tracker.advance(traj, t, config.window_for(traj.entity_id()), config.precision)
            })
            .collect();

        let camera = self.follow.active_target().and_then(|target| {
            let entity = entities.iter().find(|e| e.entity_id() == target)?;
            let heading = entity.heading()?;
            Some(self.planner.plan(entity.position(), heading))
        });

        let frame = Frame {
            sequence: self.sequence,
            time: t,
            entities,
            camera,
        };
        self.sequence += 1;
        Some(frame)
    }

    fn publish(&mut self) -> Option<Frame> {
        let frame = self.compute()?;
        if let Err(e) = self.host.present(&frame) {
            self.record_error(e);
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{LineStyle, TrailBinding};
    use crate::trajectory::{RawTrack, Sample};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[derive(Default)]
    struct TestHost {
        ready: bool,
        fail_present: bool,
        bindings: Vec<TrailBinding>,
        presented: Vec<Frame>,
    }

    impl TestHost {
        fn ready() -> Self {
            Self {
                ready: true,
                ..Default::default()
            }
        }
    }

    impl RenderHost for TestHost {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn bind_trails(&mut self, bindings: &[TrailBinding]) -> std::result::Result<(), HostError> {
            self.bindings = bindings.to_vec();
            Ok(())
        }

        fn present(&mut self, frame: &Frame) -> std::result::Result<(), HostError> {
            if self.fail_present {
                return Err(HostError::view_unavailable("scene view not loaded"));
            }
            self.presented.push(frame.clone());
            Ok(())
        }
    }

    fn bird_dataset() -> Arc<Dataset> {
        Arc::new(Dataset::from_raw(vec![RawTrack::new(
            "bird",
            vec![
                Sample::new(0.0, 0.0, 0.0, 0.0),
                Sample::new(10.0, 10.0, 0.0, 0.0),
                Sample::new(20.0, 10.0, 10.0, 0.0),
            ],
        )]))
    }

    fn controller(config: PlaybackConfig) -> AnimationController<TestHost> {
        let mut controller = AnimationController::new(TestHost::ready(), config).unwrap();
        controller.load_dataset(bird_dataset());
        controller
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = AnimationController::new(TestHost::ready(), PlaybackConfig::default().with_step(-1.0));
        assert!(matches!(result, Err(ConfigError::InvalidStep(_))));
    }

    #[test]
    fn test_load_binds_trails_and_rewinds() {
        let mut controller = AnimationController::new(
            TestHost::ready(),
            PlaybackConfig::default().with_line_style(LineStyle::Draped),
        )
        .unwrap();
        controller.load_dataset(bird_dataset());

        assert_eq!(controller.current_time(), 0.0);
        assert_eq!(controller.extent(), Some(TimeExtent::new(0.0, 20.0)));
        let bindings = &controller.host().bindings;
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].style, LineStyle::Draped);
    }

    #[test]
    fn test_tick_is_noop_while_paused() {
        let mut controller = controller(PlaybackConfig::default().with_step(5.0));
        assert!(controller.tick().is_none());
        assert_eq!(controller.current_time(), 0.0);
        assert!(controller.host().presented.is_empty());
    }

    #[test]
    fn test_tick_is_noop_before_data() {
        let mut controller =
            AnimationController::new(TestHost::ready(), PlaybackConfig::default()).unwrap();
        controller.play();
        assert!(controller.tick().is_none());
        assert!(controller.refresh().is_none());
    }

    #[test]
    fn test_tick_waits_for_host() {
        let mut controller =
            AnimationController::new(TestHost::default(), PlaybackConfig::default().with_step(5.0))
                .unwrap();
        controller.load_dataset(bird_dataset());
        controller.play();

        assert!(controller.tick().is_none());
        assert_eq!(controller.current_time(), 0.0);

        controller.host_mut().ready = true;
        let frame = controller.tick().unwrap();
        assert_eq!(frame.time, 5.0);
    }

    #[test]
    fn test_playback_steps_and_wraps() {
        let mut controller = controller(PlaybackConfig::default().with_step(5.0));
        controller.play();

        let times: Vec<f64> = (0..6).filter_map(|_| controller.tick()).map(|f| f.time).collect();
        // 20 is reachable exactly, 25 is past the end and wraps
        assert_eq!(times, vec![5.0, 10.0, 15.0, 20.0, 0.0, 5.0]);

        let wrapped = &controller.host().presented[4];
        assert_eq!(wrapped.entities[0].state.position, Vector3::zeros());
        assert_eq!(wrapped.entities[0].trail.len(), 2);
    }

    #[test]
    fn test_frame_contents_mid_segment() {
        let mut controller = controller(PlaybackConfig::default().with_trail_window(10.0));
        let frame = controller.scrub_to(15.0).unwrap();
        let bird = &frame.entities[0];

        assert_eq!(bird.state.position, Vector3::new(10.0, 5.0, 0.0));
        assert_eq!(bird.state.segment_index, 1);
        assert_relative_eq!(bird.heading().unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(
            bird.trail,
            vec![Vector3::new(10.0, 0.0, 0.0), Vector3::new(10.0, 5.0, 0.0)]
        );
        assert!(frame.camera.is_none());
    }

    #[test]
    fn test_scrub_does_not_change_play_state() {
        let mut controller = controller(PlaybackConfig::default().with_step(5.0));
        let frame = controller.scrub_to(12.0).unwrap();
        assert_eq!(frame.time, 12.0);
        assert!(!controller.is_playing());

        controller.play();
        controller.scrub_to(3.0);
        assert!(controller.is_playing());
        assert_eq!(controller.tick().unwrap().time, 8.0);
    }

    #[test]
    fn test_scrub_backwards_matches_fresh_controller() {
        let config = PlaybackConfig::default().with_step(1.0).with_trail_window(4.0);
        let mut played = controller(config.clone());
        played.play();
        for _ in 0..17 {
            played.tick();
        }
        let after_scrub = played.scrub_to(6.5).unwrap();

        let mut fresh = controller(config);
        let direct = fresh.scrub_to(6.5).unwrap();

        assert_eq!(after_scrub.entities, direct.entities);
    }

    #[test]
    fn test_scrub_outside_extent_clamps_positions() {
        let mut controller = controller(PlaybackConfig::default());
        let before = controller.scrub_to(-30.0).unwrap();
        assert_eq!(before.entities[0].state.position, Vector3::zeros());

        let after = controller.scrub_to(99.0).unwrap();
        assert_eq!(after.entities[0].state.position, Vector3::new(10.0, 10.0, 0.0));
        assert_eq!(controller.current_time(), 99.0);
    }

    #[test]
    fn test_follow_produces_camera_behind_entity() {
        let mut controller = controller(PlaybackConfig::default());
        controller.set_follow(Some(EntityId::from("bird")));
        let frame = controller.scrub_to(5.0).unwrap();
        let camera = frame.camera.unwrap();

        // Heading east: the camera sits to the west, above
        assert_relative_eq!(camera.heading, 90.0, epsilon = 1e-9);
        assert!(camera.position.x < 5.0);
        assert_relative_eq!(camera.position.y, 0.0, epsilon = 1e-9);
        assert!(camera.position.z > 0.0);
    }

    #[test]
    fn test_follow_unknown_entity_has_no_camera() {
        let mut controller = controller(PlaybackConfig::default());
        controller.set_follow(Some(EntityId::from("ghost")));
        assert!(controller.follow().following);
        assert!(controller.scrub_to(5.0).unwrap().camera.is_none());
    }

    #[test]
    fn test_release_and_toggle_follow() {
        let mut controller = controller(PlaybackConfig::default());
        controller.set_follow(Some(EntityId::from("bird")));
        assert!(!controller.toggle_follow());
        assert!(controller.scrub_to(5.0).unwrap().camera.is_none());
        assert!(controller.toggle_follow());

        controller.set_follow(None);
        assert_eq!(controller.follow(), &FollowState::default());
        assert!(!controller.toggle_follow());
    }

    #[test]
    fn test_stationary_segment_keeps_previous_heading() {
        let dataset = Arc::new(Dataset::from_raw(vec![RawTrack::new(
            "perch",
            vec![
                Sample::new(0.0, 0.0, 0.0, 0.0),
                Sample::new(10.0, 10.0, 0.0, 0.0),
                Sample::new(20.0, 10.0, 0.0, 0.0),
            ],
        )]));
        let mut controller =
            AnimationController::new(TestHost::ready(), PlaybackConfig::default().with_step(5.0))
                .unwrap();
        controller.load_dataset(dataset);
        controller.set_follow(Some(EntityId::from("perch")));
        controller.play();

        let frames: Vec<Frame> = (0..3).filter_map(|_| controller.tick()).collect();
        assert_relative_eq!(frames[2].entities[0].heading().unwrap(), 90.0);
        assert!(frames[2].camera.is_some());

        // Landing there by scrub still finds a heading
        let scrubbed = controller.scrub_to(15.0).unwrap();
        assert_relative_eq!(scrubbed.entities[0].heading().unwrap(), 90.0);
    }

    #[test]
    fn test_tick_across_turn_onto_perch_matches_scrub() {
        // East, then north, then perched
        let dataset = Arc::new(Dataset::from_raw(vec![RawTrack::new(
            "turn",
            vec![
                Sample::new(0.0, 0.0, 0.0, 0.0),
                Sample::new(10.0, 10.0, 0.0, 0.0),
                Sample::new(20.0, 10.0, 10.0, 0.0),
                Sample::new(30.0, 10.0, 10.0, 0.0),
            ],
        )]));
        let build = |step| {
            let mut controller =
                AnimationController::new(TestHost::ready(), PlaybackConfig::default().with_step(step))
                    .unwrap();
            controller.load_dataset(Arc::clone(&dataset));
            controller.set_follow(Some(EntityId::from("turn")));
            controller
        };

        let mut played = build(20.0);
        played.scrub_to(5.0).unwrap();
        played.play();
        let jumped = played.tick().unwrap();
        assert_eq!(jumped.time, 25.0);
        assert_eq!(jumped.entities[0].state.segment_index, 2);

        let direct = build(20.0).scrub_to(25.0).unwrap();
        assert_eq!(jumped.entities, direct.entities);
        assert_eq!(jumped.camera, direct.camera);
        assert_relative_eq!(jumped.entities[0].heading().unwrap(), 0.0);

        // Behind a north-facing entity means south of it
        let camera = jumped.camera.unwrap();
        assert_relative_eq!(camera.position.x, 10.0, epsilon = 1e-9);
        assert!(camera.position.y < 10.0);
    }

    #[test]
    fn test_precision_applies_to_position_and_trail_end() {
        let dataset = Arc::new(Dataset::from_raw(vec![RawTrack::new(
            "third",
            vec![Sample::new(0.0, 0.0, 0.0, 0.0), Sample::new(3.0, 1.0, 0.0, 0.0)],
        )]));
        let mut controller = AnimationController::new(
            TestHost::ready(),
            PlaybackConfig::default().with_precision(Precision::Decimals(2)),
        )
        .unwrap();
        controller.load_dataset(dataset);

        let frame = controller.scrub_to(1.0).unwrap();
        let entity = &frame.entities[0];
        assert_eq!(entity.state.position.x, 0.33);
        assert_eq!(entity.trail.last(), Some(&entity.state.position));
    }

    #[test]
    fn test_host_error_is_recorded_and_frames_continue() {
        let mut controller = controller(PlaybackConfig::default().with_step(5.0));
        controller.host_mut().fail_present = true;
        controller.play();

        let frame = controller.tick();
        assert!(frame.is_some());
        assert_eq!(
            controller.last_error().map(|e| e.name.as_str()),
            Some("ViewUnavailable")
        );

        controller.host_mut().fail_present = false;
        controller.clear_error();
        controller.tick();
        assert!(controller.last_error().is_none());
        assert_eq!(controller.host().presented.len(), 1);
    }

    #[test]
    fn test_sequence_increases_per_published_frame() {
        let mut controller = controller(PlaybackConfig::default().with_step(5.0));
        controller.play();
        let a = controller.tick().unwrap();
        let b = controller.scrub_to(2.0).unwrap();
        let c = controller.refresh().unwrap();
        assert_eq!((a.sequence, b.sequence, c.sequence), (0, 1, 2));
        assert_eq!(c.time, 2.0);
    }

    #[test]
    fn test_config_extent_overrides_dataset() {
        let mut controller = controller(
            PlaybackConfig::default()
                .with_step(4.0)
                .with_time_extent(TimeExtent::new(8.0, 16.0)),
        );
        // Reload so the override is applied on load
        controller.load_dataset(bird_dataset());
        assert_eq!(controller.current_time(), 8.0);

        controller.play();
        let times: Vec<f64> = (0..3).filter_map(|_| controller.tick()).map(|f| f.time).collect();
        assert_eq!(times, vec![12.0, 16.0, 8.0]);
    }

    #[test]
    fn test_runtime_step_and_window_validation() {
        let mut controller = controller(PlaybackConfig::default());
        assert_eq!(controller.set_step(0.0), Err(ConfigError::InvalidStep(0.0)));
        assert!(controller.set_step(2.0).is_ok());
        assert_eq!(controller.set_trail_window(-3.0), Err(ConfigError::InvalidWindow(-3.0)));
        assert!(controller.set_trail_window(3.0).is_ok());

        let frame = controller.scrub_to(15.0).unwrap();
        assert_eq!(frame.entities[0].window, None);
        assert_eq!(frame.entities[0].trail.len(), 1);
    }
}
