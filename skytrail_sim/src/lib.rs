//! skytrail Deterministic Replay Harness
//!
//! This crate runs the playback engine headless, against flights whose true
//! positions are known analytically, so every published frame can be checked.
//!
//! # Core Principle: Nothing Real Leaks In
//!
//! All sources of non-determinism are replaced:
//! - **Frames**: a virtual [`SimClock`] hands out frame numbers on demand
//! - **Rendering**: a [`RecordingHost`] stores bindings and frames
//! - **Data**: the [`Oracle`] samples straight-line flights from one seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      SimWorld                        │
//! │  ┌──────────┐   tick    ┌─────────────────────────┐  │
//! │  │ SimClock │──────────►│   AnimationController   │  │
//! │  └──────────┘           │   (RecordingHost)       │  │
//! │                         └────────────▲────────────┘  │
//! │                                      │ Dataset       │
//! │  ┌───────────────────────────────────┴────────────┐  │
//! │  │                  Oracle                        │  │
//! │  │      (ground truth flights + sampling)         │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use skytrail_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 8).run(ScenarioId::ScrubStorm);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod host;
pub mod ingest;
mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimClock;
pub use exporter::{EntityPosition, SimExport, SimFrame};
pub use host::RecordingHost;
pub use ingest::{load_movebank_csv, IngestError, IngestReport};
pub use oracle::{GroundTruthFlight, Oracle, SIM_EPOCH};
pub use runner::{
    check_frame, check_truth, heading_difference, ScenarioMetrics, ScenarioResult, ScenarioRunner,
};
pub use scenarios::ScenarioId;
pub use world::{drive, SimConfig, SimWorld};
