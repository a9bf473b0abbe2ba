//! Segment location: which pair of samples encloses a query time.
//!
//! Segment `i` spans `samples[i].t <= t < samples[i + 1].t`. Query times
//! before the first sample clamp to segment 0 and times at or after the last
//! sample clamp to the final segment, so every query has an answer.
//!
//! Random access (scrubbing) binary-searches the timestamps. Playback moves
//! forward in small steps, so [`SegmentCursor`] resumes from the previous
//! answer and only falls back to binary search for long jumps or when time
//! moves backwards.

use crate::trajectory::{Sample, Trajectory};

/// Maximum samples stepped over linearly before switching to binary search.
const FORWARD_SCAN_LIMIT: usize = 8;

/// Finds the segment enclosing `t`.
///
/// When `t` equals a sample timestamp exactly, the segment starting at that
/// sample is returned.
pub fn locate(trajectory: &Trajectory, t: f64) -> usize {
    locate_in(trajectory.samples(), t)
}

/// Binary search over a validated sample slice (length >= 2).
pub(crate) fn locate_in(samples: &[Sample], t: f64) -> usize {
    let last_segment = samples.len() - 2;
    samples
        .partition_point(|s| s.t <= t)
        .saturating_sub(1)
        .min(last_segment)
}

/// Continue from `from`, assuming the answer is at or after it.
fn scan_forward(samples: &[Sample], from: usize, t: f64) -> usize {
    let last_segment = samples.len() - 2;
    let mut i = from.min(last_segment);
    for _ in 0..FORWARD_SCAN_LIMIT {
        if i >= last_segment || samples[i + 1].t > t {
            return i;
        }
        i += 1;
    }
    // Long jump: samples[i].t <= t still holds, search the remaining tail
    let tail = samples[i..].partition_point(|s| s.t <= t).saturating_sub(1);
    (i + tail).min(last_segment)
}

/// Cached segment index for one entity across consecutive queries.
#[derive(Debug, Clone, Default)]
pub struct SegmentCursor {
    index: usize,
    last_time: Option<f64>,
    full_searches: u64,
}

impl SegmentCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the hint; the next `seek` does a full search.
    pub fn reset(&mut self) {
        self.last_time = None;
    }

    /// Index returned by the last `seek`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of binary searches performed, for diagnostics.
    pub fn full_searches(&self) -> u64 {
        self.full_searches
    }

    /// Locates `t`, reusing the previous index when time did not go back.
    ///
    /// Always returns the same index as [`locate`].
    pub fn seek(&mut self, trajectory: &Trajectory, t: f64) -> usize {
        let samples = trajectory.samples();
        let index = match self.last_time {
            Some(previous) if t >= previous => scan_forward(samples, self.index, t),
            _ => {
                self.full_searches += 1;
                locate_in(samples, t)
            }
        };
        self.index = index;
        self.last_time = Some(t);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skytrail_env::EntityId;

    fn trajectory(times: &[f64]) -> Trajectory {
        let samples = times
            .iter()
            .enumerate()
            .map(|(i, &t)| Sample::new(t, i as f64, 0.0, 0.0))
            .collect();
        Trajectory::new(EntityId::from("t"), samples).unwrap()
    }

    #[test]
    fn test_locate_interior() {
        let traj = trajectory(&[0.0, 10.0, 20.0]);
        assert_eq!(locate(&traj, 5.0), 0);
        assert_eq!(locate(&traj, 15.0), 1);
    }

    #[test]
    fn test_locate_exact_timestamp_starts_segment() {
        let traj = trajectory(&[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(locate(&traj, 0.0), 0);
        assert_eq!(locate(&traj, 10.0), 1);
        assert_eq!(locate(&traj, 20.0), 2);
    }

    #[test]
    fn test_locate_clamps_both_ends() {
        let traj = trajectory(&[0.0, 10.0, 20.0]);
        assert_eq!(locate(&traj, -100.0), 0);
        assert_eq!(locate(&traj, 20.0), 1);
        assert_eq!(locate(&traj, 25.0), 1);
    }

    #[test]
    fn test_locate_duplicate_timestamps() {
        let traj = trajectory(&[0.0, 10.0, 10.0, 20.0]);
        // Last sample stamped 10 that still has a successor
        assert_eq!(locate(&traj, 10.0), 2);
        assert_eq!(locate(&traj, 9.0), 0);

        let tail = trajectory(&[0.0, 10.0, 10.0]);
        assert_eq!(locate(&tail, 10.0), 1);
    }

    #[test]
    fn test_locate_non_uniform_spacing() {
        let traj = trajectory(&[0.0, 0.5, 90.0, 91.0, 5000.0]);
        assert_eq!(locate(&traj, 0.7), 1);
        assert_eq!(locate(&traj, 90.5), 2);
        assert_eq!(locate(&traj, 4999.0), 3);
    }

    #[test]
    fn test_cursor_matches_locate_forward() {
        let times: Vec<f64> = (0..200).map(|i| (i * i) as f64 * 0.25).collect();
        let traj = trajectory(&times);
        let mut cursor = SegmentCursor::new();

        let mut t = -3.0;
        let mut previous = 0;
        while t < 11_000.0 {
            let i = cursor.seek(&traj, t);
            assert_eq!(i, locate(&traj, t), "t = {}", t);
            assert!(i >= previous);
            previous = i;
            t += 7.3;
        }
        // Only the first query needed a binary search
        assert_eq!(cursor.full_searches(), 1);
    }

    #[test]
    fn test_cursor_long_forward_jump() {
        let times: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let traj = trajectory(&times);
        let mut cursor = SegmentCursor::new();

        assert_eq!(cursor.seek(&traj, 1.5), 1);
        assert_eq!(cursor.seek(&traj, 750.25), 750);
        assert_eq!(cursor.seek(&traj, 2000.0), 998);
    }

    #[test]
    fn test_cursor_backward_does_full_search() {
        let traj = trajectory(&[0.0, 10.0, 20.0, 30.0]);
        let mut cursor = SegmentCursor::new();

        assert_eq!(cursor.seek(&traj, 25.0), 2);
        assert_eq!(cursor.seek(&traj, 5.0), 0);
        assert_eq!(cursor.full_searches(), 2);
    }

    #[test]
    fn test_cursor_reset() {
        let traj = trajectory(&[0.0, 10.0, 20.0, 30.0]);
        let mut cursor = SegmentCursor::new();
        cursor.seek(&traj, 25.0);
        cursor.reset();
        assert_eq!(cursor.seek(&traj, 26.0), 2);
        assert_eq!(cursor.full_searches(), 2);
    }
}
