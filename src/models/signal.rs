use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::communication::messages::TickEvent;
use crate::models::approach::{next_in_rotation, Approach};

/// The possible states for a traffic light head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LightState::Green => write!(f, "GREEN"),
            LightState::Yellow => write!(f, "YELLOW"),
            LightState::Red => write!(f, "RED"),
        }
    }
}

/// Operator-facing label shown under each signal head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Go,
    Next,
    Stop,
    EmergencyGreen,
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SignalStatus::Go => write!(f, "GO"),
            SignalStatus::Next => write!(f, "NEXT"),
            SignalStatus::Stop => write!(f, "STOP"),
            SignalStatus::EmergencyGreen => write!(f, "EMERGENCY GREEN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Normal,
    Emergency,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PhaseKind::Normal => write!(f, "NORMAL"),
            PhaseKind::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// Assignment of colours and statuses to every approach while one approach holds the green.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub active: Approach,
    /// The approach after `active` in rotation order; it shares the countdown.
    pub next: Approach,
    pub kind: PhaseKind,
    pub color_by_approach: BTreeMap<Approach, LightState>,
    pub status_by_approach: BTreeMap<Approach, SignalStatus>,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
}

impl Phase {
    /// Normal rotation: active is green/GO, next is yellow/NEXT, everything else red/STOP.
    pub fn normal(order: &[Approach], active_index: usize, duration_seconds: u32) -> Self {
        Self::layout(order, active_index, PhaseKind::Normal, duration_seconds)
    }

    /// Emergency override: active is green/EMERGENCY GREEN, next stays red but is marked NEXT.
    pub fn emergency(order: &[Approach], active_index: usize, duration_seconds: u32) -> Self {
        Self::layout(order, active_index, PhaseKind::Emergency, duration_seconds)
    }

    fn layout(
        order: &[Approach],
        active_index: usize,
        kind: PhaseKind,
        duration_seconds: u32,
    ) -> Self {
        let active = order[active_index];
        let next = next_in_rotation(order, active_index);

        let mut color_by_approach = BTreeMap::new();
        let mut status_by_approach = BTreeMap::new();
        for &approach in order {
            let (color, status) = if approach == active {
                match kind {
                    PhaseKind::Normal => (LightState::Green, SignalStatus::Go),
                    PhaseKind::Emergency => (LightState::Green, SignalStatus::EmergencyGreen),
                }
            } else if approach == next {
                match kind {
                    PhaseKind::Normal => (LightState::Yellow, SignalStatus::Next),
                    PhaseKind::Emergency => (LightState::Red, SignalStatus::Next),
                }
            } else {
                (LightState::Red, SignalStatus::Stop)
            };
            color_by_approach.insert(approach, color);
            status_by_approach.insert(approach, status);
        }

        Self {
            active,
            next,
            kind,
            color_by_approach,
            status_by_approach,
            duration_seconds,
            remaining_seconds: duration_seconds,
        }
    }

    pub fn color_of(&self, approach: Approach) -> Option<LightState> {
        self.color_by_approach.get(&approach).copied()
    }

    /// Countdown shown on a head: the active and next approaches share it, the rest show none.
    pub fn countdown_of(&self, approach: Approach) -> Option<u32> {
        if approach == self.active || approach == self.next {
            Some(self.remaining_seconds)
        } else {
            None
        }
    }

    pub fn green_approaches(&self) -> Vec<Approach> {
        self.color_by_approach
            .iter()
            .filter(|(_, &color)| color == LightState::Green)
            .map(|(&approach, _)| approach)
            .collect()
    }

    // More than one green head at once is a conflict.
    pub fn check_conflicts(&self) -> bool {
        self.green_approaches().len() > 1
    }

    pub fn tick_event(&self, cycle: u32) -> TickEvent {
        let approach_countdowns = self
            .color_by_approach
            .keys()
            .map(|&approach| (approach, self.countdown_of(approach)))
            .collect();
        TickEvent {
            cycle,
            kind: self.kind,
            active: self.active,
            remaining_seconds: self.remaining_seconds,
            approach_colors: self.color_by_approach.clone(),
            approach_statuses: self.status_by_approach.clone(),
            approach_countdowns,
        }
    }
}
