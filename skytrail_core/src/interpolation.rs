//! Position and heading within a located segment.
//!
//! Heading convention: compass bearing, degrees clockwise from north (+Y),
//! in `[0, 360)`. Everything downstream (trail, camera) consumes it as-is.

use crate::error::ConfigError;
use crate::trajectory::Trajectory;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Most decimal places an f64 coordinate can meaningfully carry.
pub const MAX_DECIMALS: u32 = 15;

/// Output rounding for interpolated coordinates, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Keep full floating-point precision.
    #[default]
    Full,
    /// Round all three axes to this many decimal places.
    Decimals(u32),
}

impl Precision {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Precision::Decimals(places) if places > MAX_DECIMALS => {
                Err(ConfigError::InvalidPrecision(places))
            }
            _ => Ok(()),
        }
    }

    /// Applies the rounding to every axis of `position`.
    pub fn apply(&self, position: Vector3<f64>) -> Vector3<f64> {
        match *self {
            Precision::Full => position,
            Precision::Decimals(places) => {
                let scale = 10f64.powi(places as i32);
                position.map(|v| (v * scale).round() / scale)
            }
        }
    }
}

/// Fraction of the way through segment `i` at time `t`, clamped to [0, 1].
///
/// A zero-length segment (duplicate timestamps) yields 0.
pub fn segment_fraction(trajectory: &Trajectory, i: usize, t: f64) -> f64 {
    let t0 = trajectory.sample(i).t;
    let t1 = trajectory.sample(i + 1).t;
    let span = t1 - t0;
    if span <= 0.0 {
        return 0.0;
    }
    ((t - t0) / span).clamp(0.0, 1.0)
}

/// Component-wise lerp that hits both endpoints exactly and never leaves the
/// bounding box of `a` and `b`.
pub fn lerp(a: &Vector3<f64>, b: &Vector3<f64>, f: f64) -> Vector3<f64> {
    if f <= 0.0 {
        return *a;
    }
    if f >= 1.0 {
        return *b;
    }
    Vector3::from_fn(|axis, _| {
        let (lo, hi) = if a[axis] <= b[axis] {
            (a[axis], b[axis])
        } else {
            (b[axis], a[axis])
        };
        (a[axis] + (b[axis] - a[axis]) * f).clamp(lo, hi)
    })
}

/// Compass bearing from `from` to `to` in the horizontal plane.
///
/// `None` when the two points coincide horizontally.
pub fn bearing(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<f64> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let degrees = dx.atan2(dy).to_degrees();
    let wrapped = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    // A tiny negative angle can round up to exactly 360
    Some(if wrapped >= 360.0 { 0.0 } else { wrapped })
}

/// Heading of segment `i` (start to end), `None` if it has no horizontal extent.
pub fn segment_heading(trajectory: &Trajectory, i: usize) -> Option<f64> {
    bearing(
        &trajectory.sample(i).position,
        &trajectory.sample(i + 1).position,
    )
}

/// Heading of the nearest segment at or before `i` that moves horizontally.
///
/// Used when a degenerate segment is reached without a remembered heading.
pub fn heading_at_or_before(trajectory: &Trajectory, i: usize) -> Option<f64> {
    (0..=i).rev().find_map(|k| segment_heading(trajectory, k))
}

/// Interpolates `trajectory` at time `t` within segment `i`.
///
/// Returns the position and the segment heading; the heading is `None` on
/// a segment without horizontal displacement and the caller decides what
/// to substitute.
pub fn interpolate(trajectory: &Trajectory, i: usize, t: f64) -> (Vector3<f64>, Option<f64>) {
    let f = segment_fraction(trajectory, i, t);
    let position = lerp(
        &trajectory.sample(i).position,
        &trajectory.sample(i + 1).position,
        f,
    );
    (position, segment_heading(trajectory, i))
}
