//! Replay scenarios for the simulation harness.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SKY-001: forward playback over clean flights, checked against ground truth
    SteadyReplay,

    /// SKY-002: random scrubs interleaved with playback
    ScrubStorm,

    /// SKY-003: play through the end of the extent several times
    LoopWrap,

    /// SKY-004: sparse, irregular sampling with a short trail window
    SparseSampling,

    /// SKY-005: broken tracks, duplicate timestamps and altitude noise
    DegenerateData,

    /// SKY-006: chase camera following one flight
    ChaseCam,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyReplay,
            ScenarioId::ScrubStorm,
            ScenarioId::LoopWrap,
            ScenarioId::SparseSampling,
            ScenarioId::DegenerateData,
            ScenarioId::ChaseCam,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyReplay => "steady_replay",
            ScenarioId::ScrubStorm => "scrub_storm",
            ScenarioId::LoopWrap => "loop_wrap",
            ScenarioId::SparseSampling => "sparse_sampling",
            ScenarioId::DegenerateData => "degenerate_data",
            ScenarioId::ChaseCam => "chase_cam",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SteadyReplay => "Forward playback, positions and headings match ground truth",
            ScenarioId::ScrubStorm => "Random scrubs agree with a fresh controller at the same time",
            ScenarioId::LoopWrap => "Playback wraps to the extent start and stays inside it",
            ScenarioId::SparseSampling => "Hour-scale gaps, trail windows hold only in-range samples",
            ScenarioId::DegenerateData => "Broken tracks rejected, duplicates and noise tolerated",
            ScenarioId::ChaseCam => "Camera stays behind and above the followed flight",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady_replay" | "steadyreplay" | "sky-001" => Ok(ScenarioId::SteadyReplay),
            "scrub_storm" | "scrubstorm" | "sky-002" => Ok(ScenarioId::ScrubStorm),
            "loop_wrap" | "loopwrap" | "sky-003" => Ok(ScenarioId::LoopWrap),
            "sparse_sampling" | "sparsesampling" | "sky-004" => Ok(ScenarioId::SparseSampling),
            "degenerate_data" | "degeneratedata" | "sky-005" => Ok(ScenarioId::DegenerateData),
            "chase_cam" | "chasecam" | "sky-006" => Ok(ScenarioId::ChaseCam),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
