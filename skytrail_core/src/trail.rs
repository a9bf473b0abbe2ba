//! Sliding-window trail trimming.
//!
//! A trail is every stored sample whose timestamp lies in
//! `[t - window, t]`, followed by the live interpolated point at `t` so the
//! line always reaches the entity. A window of zero means "from the first
//! sample" (cumulative trail).

use crate::interpolation::interpolate;
use crate::locator::locate_in;
use crate::trajectory::{Sample, Trajectory};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Samples stepped over linearly before the lower bound switches to binary search.
const FORWARD_SCAN_LIMIT: usize = 8;

/// Inclusive sample-index bounds of the stored part of a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailWindow {
    pub start_index: usize,
    pub end_index: usize,
}

impl TrailWindow {
    /// Number of stored samples in the window.
    pub fn sample_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// First index whose timestamp is >= `t_min`.
fn lower_bound(samples: &[Sample], t_min: f64) -> usize {
    samples.partition_point(|s| s.t < t_min)
}

/// Last sample stamped at or before `t`, given the segment `i_now` enclosing `t`.
fn last_sample_at_or_before(samples: &[Sample], i_now: usize, t: f64) -> Option<usize> {
    if samples[i_now + 1].t <= t {
        Some(i_now + 1)
    } else if samples[i_now].t <= t {
        Some(i_now)
    } else {
        None
    }
}

fn window_start(samples: &[Sample], window: f64, t: f64) -> usize {
    if window > 0.0 {
        lower_bound(samples, t - window)
    } else {
        0
    }
}

/// Stateless trim: binary-searches both bounds.
///
/// Returns the window bounds (`None` when no stored sample is in range)
/// and the trail points ending with the interpolated position at `t`.
pub fn trim(
    trajectory: &Trajectory,
    i_now: usize,
    window: f64,
    t: f64,
) -> (Option<TrailWindow>, Vec<Vector3<f64>>) {
    let (live, _) = interpolate(trajectory, i_now, t);
    let start = window_start(trajectory.samples(), window, t);
    build(trajectory, start, i_now, t, live)
}

fn build(
    trajectory: &Trajectory,
    start: usize,
    i_now: usize,
    t: f64,
    live: Vector3<f64>,
) -> (Option<TrailWindow>, Vec<Vector3<f64>>) {
    let samples = trajectory.samples();
    let window = last_sample_at_or_before(samples, i_now, t)
        .filter(|&end| start <= end)
        .map(|end| TrailWindow {
            start_index: start,
            end_index: end,
        });

    let mut points = match window {
        Some(w) => {
            let mut points = Vec::with_capacity(w.sample_count() + 1);
            points.extend(samples[w.start_index..=w.end_index].iter().map(|s| s.position));
            points
        }
        None => Vec::with_capacity(1),
    };
    points.push(live);
    (window, points)
}

/// Per-entity trimmer that keeps the window's lower bound between calls.
///
/// Under forward playback the lower bound only moves forward, in lockstep
/// with the segment cursor. When time moves backwards, or the window
/// length changes, it is re-derived from scratch.
#[derive(Debug, Clone, Default)]
pub struct WindowTrimmer {
    lower: usize,
    last_time: Option<f64>,
    last_window: f64,
}

impl WindowTrimmer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached lower bound.
    pub fn reset(&mut self) {
        self.last_time = None;
    }

    fn advance_lower(&self, samples: &[Sample], window: f64, t: f64) -> usize {
        if window <= 0.0 {
            return 0;
        }
        let t_min = t - window;
        let mut j = self.lower;
        for _ in 0..FORWARD_SCAN_LIMIT {
            if j >= samples.len() || samples[j].t >= t_min {
                return j;
            }
            j += 1;
        }
        j + lower_bound(&samples[j.min(samples.len())..], t_min)
    }

    /// Trims the trail for `t`, ending it with `live`.
    ///
    /// `i_now` must be the segment enclosing `t` and `live` the position
    /// published for it.
    pub fn trim(
        &mut self,
        trajectory: &Trajectory,
        i_now: usize,
        window: f64,
        t: f64,
        live: Vector3<f64>,
    ) -> (Option<TrailWindow>, Vec<Vector3<f64>>) {
        let samples = trajectory.samples();
        let lower = match self.last_time {
            Some(previous) if t >= previous && window == self.last_window => {
                self.advance_lower(samples, window, t)
            }
            _ => window_start(samples, window, t),
        };
        self.lower = lower;
        self.last_time = Some(t);
        self.last_window = window;
        build(trajectory, lower, i_now, t, live)
    }

    /// Convenience for callers without a cursor: locates `t` itself.
    pub fn trim_at(
        &mut self,
        trajectory: &Trajectory,
        window: f64,
        t: f64,
    ) -> (Option<TrailWindow>, Vec<Vector3<f64>>) {
        let i_now = locate_in(trajectory.samples(), t);
        let (live, _) = interpolate(trajectory, i_now, t);
        self.trim(trajectory, i_now, window, t, live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::locate;
    use skytrail_env::EntityId;

    fn scenario_trajectory() -> Trajectory {
        Trajectory::new(
            EntityId::from("bird"),
            vec![
                Sample::new(0.0, 0.0, 0.0, 0.0),
                Sample::new(10.0, 10.0, 0.0, 0.0),
                Sample::new(20.0, 10.0, 10.0, 0.0),
            ],
        )
        .unwrap()
    }

    fn line(n: usize) -> Trajectory {
        let samples = (0..n).map(|i| Sample::new(i as f64, i as f64, 0.0, 0.0)).collect();
        Trajectory::new(EntityId::from("line"), samples).unwrap()
    }

    #[test]
    fn test_window_of_ten_at_fifteen() {
        let traj = scenario_trajectory();
        let i = locate(&traj, 15.0);
        let (window, points) = trim(&traj, i, 10.0, 15.0);

        // Sample at t=10 is the only stored one in [5, 15]
        assert_eq!(
            window,
            Some(TrailWindow {
                start_index: 1,
                end_index: 1
            })
        );
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Vector3::new(10.0, 0.0, 0.0));
        assert_eq!(points[1], Vector3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_zero_window_is_full_history() {
        let traj = scenario_trajectory();
        let (window, points) = trim(&traj, 1, 0.0, 15.0);

        assert_eq!(
            window,
            Some(TrailWindow {
                start_index: 0,
                end_index: 1
            })
        );
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Vector3::zeros());
    }

    #[test]
    fn test_past_end_includes_last_sample() {
        let traj = scenario_trajectory();
        let (window, points) = trim(&traj, 1, 0.0, 25.0);

        assert_eq!(window.map(|w| w.end_index), Some(2));
        assert_eq!(points.last(), Some(&Vector3::new(10.0, 10.0, 0.0)));
    }

    #[test]
    fn test_before_start_is_only_live_point() {
        let traj = scenario_trajectory();
        let (window, points) = trim(&traj, 0, 5.0, -3.0);

        assert_eq!(window, None);
        assert_eq!(points, vec![Vector3::zeros()]);
    }

    #[test]
    fn test_window_between_samples_is_only_live_point() {
        let traj = scenario_trajectory();
        // [11, 12] holds no stored sample
        let (window, points) = trim(&traj, 1, 1.0, 12.0);
        assert_eq!(window, None);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_trimmer_matches_stateless_trim_forward() {
        let traj = line(500);
        let mut trimmer = WindowTrimmer::new();
        let mut t = 0.0;
        let mut previous_start = 0;
        while t < 520.0 {
            let i = locate(&traj, t);
            let (live, _) = interpolate(&traj, i, t);
            let stateful = trimmer.trim(&traj, i, 25.0, t, live);
            let stateless = trim(&traj, i, 25.0, t);
            assert_eq!(stateful, stateless, "t = {}", t);

            if let Some(w) = stateful.0 {
                assert!(w.start_index >= previous_start);
                previous_start = w.start_index;
            }
            t += 3.7;
        }
    }

    #[test]
    fn test_trimmer_long_jump_and_backward_scrub() {
        let traj = line(1000);
        let mut trimmer = WindowTrimmer::new();

        let (w, _) = trimmer.trim_at(&traj, 10.0, 20.0);
        assert_eq!(w.map(|w| w.start_index), Some(10));

        let (w, _) = trimmer.trim_at(&traj, 10.0, 900.5);
        assert_eq!(
            w,
            Some(TrailWindow {
                start_index: 891,
                end_index: 900
            })
        );

        // Scrub back
        let (w, points) = trimmer.trim_at(&traj, 10.0, 40.0);
        assert_eq!(
            w,
            Some(TrailWindow {
                start_index: 30,
                end_index: 40
            })
        );
        assert_eq!(points.last(), Some(&Vector3::new(40.0, 0.0, 0.0)));
    }

    #[test]
    fn test_trimmer_window_change_rederives() {
        let traj = line(100);
        let mut trimmer = WindowTrimmer::new();
        trimmer.trim_at(&traj, 5.0, 50.0);

        let (w, _) = trimmer.trim_at(&traj, 30.0, 50.5);
        assert_eq!(w.map(|w| w.start_index), Some(21));
    }
}
