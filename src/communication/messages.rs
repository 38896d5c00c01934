use crate::models::{Approach, LightState, Phase, PhaseKind, SignalStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// One second of phase countdown, as seen by every signal head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    pub cycle: u32,
    pub kind: PhaseKind,
    pub active: Approach,
    pub remaining_seconds: u32,
    pub approach_colors: BTreeMap<Approach, LightState>,
    pub approach_statuses: BTreeMap<Approach, SignalStatus>,
    pub approach_countdowns: BTreeMap<Approach, Option<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxCyclesReached,
    StopRequested,
}

/// Counters reported when the scheduler reaches its terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub cycles_completed: u32,
    pub normal_phases: u32,
    pub emergency_phases: u32,
    pub ticks_emitted: u64,
    pub stop_reason: Option<StopReason>,
}

/// Everything the scheduler publishes to display consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    CycleStarted {
        cycle: u32,
        suppressed: Vec<Approach>,
    },
    EmergencyDetected {
        cycle: u32,
        approach: Approach,
    },
    PhaseStarted(Phase),
    Tick(TickEvent),
    PhaseEnded {
        active: Approach,
        next: Approach,
        kind: PhaseKind,
    },
    Finished(RunSummary),
}

/// Raised once when an abnormal road condition (e.g. a collision) is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyRaised {
    pub timestamp: u64,
    pub confidence: f32,
    pub frame: Option<u64>,
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
