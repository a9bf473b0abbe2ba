//! Property tests for segment location, interpolation and trail trimming.
//!
//! Run with: cargo test -p skytrail_core --test properties

use nalgebra::Vector3;
use proptest::prelude::*;
use skytrail_core::camera::plan;
use skytrail_core::interpolation::{heading_at_or_before, interpolate};
use skytrail_core::trail::trim;
use skytrail_core::{
    locate, AnimationController, Dataset, EntityId, Frame, HostError, PlaybackConfig, RenderHost,
    Sample, SegmentCursor, TrailBinding, Trajectory, WindowTrimmer,
};
use std::sync::Arc;

/// Trajectories with non-decreasing timestamps, duplicates included.
fn trajectory_strategy() -> impl Strategy<Value = Trajectory> {
    prop::collection::vec(
        (
            prop_oneof![Just(0.0), 0.01f64..50.0],
            -1e3f64..1e3,
            -1e3f64..1e3,
            0.0f64..500.0,
        ),
        2..40,
    )
    .prop_map(|steps| {
        let mut t = 1_000.0;
        let samples = steps
            .into_iter()
            .map(|(dt, x, y, z)| {
                t += dt;
                Sample::new(t, x, y, z)
            })
            .collect();
        Trajectory::new(EntityId::from("prop"), samples).unwrap()
    })
}

/// Trajectories that stop often: `None` repeats the previous position.
fn perching_strategy() -> impl Strategy<Value = Trajectory> {
    prop::collection::vec(
        (
            0.5f64..30.0,
            prop_oneof![
                2 => Just(None),
                1 => (-1e3f64..1e3, -1e3f64..1e3).prop_map(Some),
            ],
        ),
        2..40,
    )
    .prop_map(|steps| {
        let mut t = 0.0;
        let mut at = Vector3::new(0.0, 0.0, 50.0);
        let samples = steps
            .into_iter()
            .map(|(dt, next)| {
                t += dt;
                if let Some((x, y)) = next {
                    at = Vector3::new(x, y, 50.0);
                }
                Sample { t, position: at }
            })
            .collect();
        Trajectory::new(EntityId::from("perch"), samples).unwrap()
    })
}

fn query_times(traj: &Trajectory) -> impl Strategy<Value = Vec<f64>> {
    let lo = traj.start_time() - 20.0;
    let hi = traj.end_time() + 20.0;
    prop::collection::vec(lo..=hi, 1..30)
}

fn within(value: f64, a: f64, b: f64) -> bool {
    value >= a.min(b) && value <= a.max(b)
}

struct NullHost;

impl RenderHost for NullHost {
    fn bind_trails(&mut self, _bindings: &[TrailBinding]) -> Result<(), HostError> {
        Ok(())
    }

    fn present(&mut self, _frame: &Frame) -> Result<(), HostError> {
        Ok(())
    }
}

proptest! {
    #[test]
    fn test_locate_brackets_query(
        (traj, times) in trajectory_strategy().prop_flat_map(|t| {
            let q = query_times(&t);
            (Just(t), q)
        })
    ) {
        let samples = traj.samples();
        let last = samples.len() - 2;
        for t in times {
            let i = locate(&traj, t);
            prop_assert!(i <= last);
            if t >= samples[0].t && t < samples[samples.len() - 1].t {
                prop_assert!(samples[i].t <= t && t < samples[i + 1].t);
            }
            if t < samples[0].t {
                prop_assert_eq!(i, 0);
            }
            if t >= samples[samples.len() - 1].t {
                prop_assert_eq!(i, last);
            }
        }
    }

    #[test]
    fn test_cursor_agrees_with_binary_search(
        (traj, mut times) in trajectory_strategy().prop_flat_map(|t| {
            let q = query_times(&t);
            (Just(t), q)
        }),
        sorted in any::<bool>()
    ) {
        if sorted {
            times.sort_by(|a, b| a.total_cmp(b));
        }
        let mut cursor = SegmentCursor::new();
        for t in times {
            prop_assert_eq!(cursor.seek(&traj, t), locate(&traj, t));
        }
    }

    #[test]
    fn test_interpolation_stays_in_segment_box(
        (traj, times) in trajectory_strategy().prop_flat_map(|t| {
            let q = query_times(&t);
            (Just(t), q)
        })
    ) {
        for t in times {
            let i = locate(&traj, t);
            let (p, heading) = interpolate(&traj, i, t);
            let a = traj.sample(i).position;
            let b = traj.sample(i + 1).position;
            for axis in 0..3 {
                prop_assert!(within(p[axis], a[axis], b[axis]));
            }
            if let Some(h) = heading {
                prop_assert!((0.0..360.0).contains(&h));
            }
        }
    }

    #[test]
    fn test_interpolation_hits_samples_exactly(traj in trajectory_strategy()) {
        let samples = traj.samples();
        for (k, sample) in samples.iter().enumerate() {
            // With duplicate timestamps only the last of the run is reachable
            if k + 1 < samples.len() && samples[k + 1].t == sample.t {
                continue;
            }
            // A zero-length final segment resolves to its start
            if k + 1 == samples.len() && samples[k - 1].t == sample.t {
                continue;
            }
            let i = locate(&traj, sample.t);
            let (p, _) = interpolate(&traj, i, sample.t);
            prop_assert_eq!(p, sample.position);
        }
    }

    #[test]
    fn test_trail_window_and_live_point(
        (traj, times) in trajectory_strategy().prop_flat_map(|t| {
            let q = query_times(&t);
            (Just(t), q)
        }),
        window in prop_oneof![Just(0.0), 0.5f64..200.0]
    ) {
        let mut trimmer = WindowTrimmer::new();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        for t in sorted {
            let i = locate(&traj, t);
            let (live, _) = interpolate(&traj, i, t);
            let (bounds, points) = trim(&traj, i, window, t);

            prop_assert_eq!(points.last(), Some(&live));
            match bounds {
                Some(w) => {
                    prop_assert_eq!(points.len(), w.sample_count() + 1);
                    for k in w.start_index..=w.end_index {
                        let s = traj.sample(k).t;
                        prop_assert!(s <= t);
                        if window > 0.0 {
                            prop_assert!(s >= t - window);
                        }
                    }
                }
                None => prop_assert_eq!(points.len(), 1),
            }

            let stateful = trimmer.trim(&traj, i, window, t, live);
            prop_assert_eq!(stateful, (bounds, points));
        }
    }

    #[test]
    fn test_camera_offset_is_exact(
        x in -1e5f64..1e5,
        y in -1e5f64..1e5,
        z in 0.0f64..1e4,
        heading in 0.0f64..360.0,
        distance in 0.0f64..1e3,
        lift in 0.0f64..1e3
    ) {
        let entity = Vector3::new(x, y, z);
        let pose = plan(&entity, heading, distance, lift, 70.0, 50.0);
        let offset = pose.position - entity;
        let horizontal = offset.x.hypot(offset.y);
        prop_assert!((horizontal - distance).abs() <= 1e-6 * (1.0 + distance));
        prop_assert!((offset.z - lift).abs() <= 1e-9 * (1.0 + lift + z));
    }

    #[test]
    fn test_playback_time_stays_in_extent(
        traj in trajectory_strategy(),
        step in 0.5f64..120.0,
        ticks in 1usize..200
    ) {
        let extent = traj.extent();
        let dataset = Arc::new(Dataset::from_trajectories(vec![traj]));
        let config = PlaybackConfig::default().with_step(step);
        let mut controller = AnimationController::new(NullHost, config).unwrap();
        controller.load_dataset(dataset);
        controller.play();

        let mut previous = controller.current_time();
        for _ in 0..ticks {
            let frame = controller.tick().unwrap();
            prop_assert!(extent.contains(frame.time));
            prop_assert!(frame.time > previous || frame.time == extent.start);
            prop_assert_eq!(frame.entities[0].trail.last(), Some(frame.entities[0].position()));
            previous = frame.time;
        }
    }

    #[test]
    fn test_played_heading_matches_direct_scrub(
        traj in perching_strategy(),
        start in 0.0f64..100.0,
        step in 1.0f64..90.0,
        ticks in 1usize..60
    ) {
        let dataset = Arc::new(Dataset::from_trajectories(vec![traj.clone()]));
        let target = EntityId::from("perch");
        let mut played = AnimationController::new(NullHost, PlaybackConfig::default().with_step(step)).unwrap();
        let mut direct = AnimationController::new(NullHost, PlaybackConfig::default()).unwrap();
        for controller in [&mut played, &mut direct] {
            controller.load_dataset(Arc::clone(&dataset));
            controller.set_follow(Some(target.clone()));
        }

        played.scrub_to(start).unwrap();
        played.play();
        for _ in 0..ticks {
            let frame = played.tick().unwrap();
            let expected = direct.scrub_to(frame.time).unwrap();
            let i = locate(&traj, frame.time);
            prop_assert_eq!(frame.entities[0].heading(), heading_at_or_before(&traj, i));
            prop_assert_eq!(&frame.entities, &expected.entities);
            prop_assert_eq!(frame.camera, expected.camera);
        }
    }
}
