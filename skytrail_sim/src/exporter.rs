//! JSON exporter for replay runs.
//!
//! Writes the published frames of a run so they can be plotted or diffed
//! outside the harness.

use serde::{Deserialize, Serialize};
use skytrail_core::{Frame, TimeReadout};
use std::fs::File;
use std::io::Write;

/// A single exported frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    pub sequence: u64,

    /// Query time (Unix seconds)
    pub time_sec: f64,

    /// Readout date line, e.g. "Jan 01, 2024"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Readout clock line, e.g. "06:05"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,

    /// Scene lighting date (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_date: Option<String>,

    pub entities: Vec<EntityPosition>,

    /// Chase camera position, when following
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<[f64; 3]>,
}

/// Position of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    pub trail_len: usize,
}

impl From<&Frame> for SimFrame {
    fn from(frame: &Frame) -> Self {
        let readout = TimeReadout::from_unix_seconds(frame.time);
        Self {
            sequence: frame.sequence,
            time_sec: frame.time,
            date: readout.as_ref().map(|r| r.date.clone()),
            clock: readout.map(|r| r.clock),
            sun_date: frame.sun_date().map(|d| d.to_rfc3339()),
            entities: frame
                .entities
                .iter()
                .map(|e| EntityPosition {
                    id: e.entity_id().to_string(),
                    x: e.position().x,
                    y: e.position().y,
                    z: e.position().z,
                    heading: e.heading(),
                    trail_len: e.trail.len(),
                })
                .collect(),
            camera: frame
                .camera
                .map(|c| [c.position.x, c.position.y, c.position.z]),
        }
    }
}

/// Complete replay export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name (or "replay" for CSV input)
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Data seconds covered by the exported frames
    pub duration_sec: f64,

    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    pub fn add_frame(&mut self, frame: &Frame) {
        let frame = SimFrame::from(frame);
        if let Some(first) = self.frames.first() {
            self.duration_sec = self.duration_sec.max(frame.time_sec - first.time_sec);
        }
        self.frames.push(frame);
    }

    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
