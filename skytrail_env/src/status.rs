//! Host readiness and error state.

use crate::error::HostError;
use serde::{Deserialize, Serialize};

/// Readiness of the render host plus the last error it reported.
///
/// Owned by whoever drives the host and handed to it explicitly; there is
/// no global instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostStatus {
    view_loaded: bool,
    error: Option<HostError>,
}

impl HostStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the scene view as loaded.
    pub fn set_view_loaded(&mut self) {
        self.view_loaded = true;
    }

    pub fn view_loaded(&self) -> bool {
        self.view_loaded
    }

    /// Records an error. Both parts must be present, otherwise the current
    /// error is cleared.
    pub fn set_error(&mut self, name: Option<&str>, message: Option<&str>) {
        self.error = match (name, message) {
            (Some(name), Some(message)) if !name.is_empty() && !message.is_empty() => {
                Some(HostError::new(name, message))
            }
            _ => None,
        };
    }

    /// Records an already-built error.
    pub fn report(&mut self, error: HostError) {
        self.set_error(Some(&error.name), Some(&error.message));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&HostError> {
        self.error.as_ref()
    }

    /// The host can accept frames: the view is loaded and no error is pending.
    pub fn is_ready(&self) -> bool {
        self.view_loaded && self.error.is_none()
    }
}
