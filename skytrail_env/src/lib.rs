//! skytrail Environment Abstraction Layer
//!
//! This crate holds everything the playback engine needs from the outside
//! world without depending on a concrete renderer:
//! - Frames (`FrameClock::next_frame()`), the host's per-frame callback
//! - Host readiness and `{name, message}` errors (`HostStatus`, `HostError`)
//! - Entity identifiers (`EntityId`)
//!
//! The same driver loop runs against a Tokio timer in production and a
//! virtual clock in `skytrail_sim`.
//!
//! # Example
//!
//! ```ignore
//! use skytrail_env::FrameClock;
//!
//! async fn drive<C: FrameClock>(clock: &C, controller: &mut Controller) {
//!     while let Some(_frame) = clock.next_frame().await {
//!         controller.tick();
//!     }
//! }
//! ```

mod clock;
mod error;
mod status;
mod tokio_impl;
mod types;

pub use clock::FrameClock;
pub use error::HostError;
pub use status::HostStatus;
pub use tokio_impl::TokioFrameClock;
pub use types::EntityId;
