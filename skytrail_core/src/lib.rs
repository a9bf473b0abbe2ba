//! Skytrail Core - time-indexed trajectory playback
//!
//! Replays recorded 3D tracks (GPS-tagged animals, vehicles) in sync with a
//! shared playback clock:
//! 1. **Locate**: find the segment enclosing the query time, incrementally under playback
//! 2. **Interpolate**: position and compass heading inside that segment
//! 3. **Trail**: the recent history inside a sliding time window, ending at the live point
//! 4. **Chase**: an optional camera pose behind and above one followed entity
//!
//! [`AnimationController`] ties these together and publishes one immutable
//! [`Frame`] per tick to a [`RenderHost`].

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod host;
pub mod interpolation;
pub mod locator;
pub mod readout;
pub mod style;
pub mod trail;
pub mod trajectory;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use camera::{CameraPose, ChaseCameraPlanner, ChaseConfig};
pub use config::PlaybackConfig;
pub use controller::{AnimationController, FollowState, PlaybackState};
pub use error::{ConfigError, Error, Result, TrajectoryError};
pub use frame::{EntityFrame, Frame, InterpolatedState};
pub use host::RenderHost;
pub use interpolation::Precision;
pub use locator::{locate, SegmentCursor};
pub use readout::TimeReadout;
pub use style::{LineStyle, Rgba, TrailBinding};
pub use trail::{TrailWindow, WindowTrimmer};
pub use trajectory::{Dataset, RawTrack, Sample, TimeExtent, Trajectory};

pub use skytrail_env::{EntityId, HostError, HostStatus};
