//! Error types reported by the render host and other collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named error raised outside the engine (view creation, camera access,
/// data loading), carried upward for display as a `{name, message}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct HostError {
    /// Short error class, e.g. "ViewUnavailable"
    pub name: String,

    /// Human-readable description
    pub message: String,
}

impl HostError {
    /// Creates a host error from a name and a message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an error for a view or camera that is not available yet.
    pub fn view_unavailable(msg: impl Into<String>) -> Self {
        Self::new("ViewUnavailable", msg)
    }

    /// Creates an error for a failed data load.
    pub fn data_load(msg: impl Into<String>) -> Self {
        Self::new("DataLoadError", msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = HostError::view_unavailable("scene view destroyed");
        assert_eq!(err.to_string(), "ViewUnavailable: scene view destroyed");
    }
}
