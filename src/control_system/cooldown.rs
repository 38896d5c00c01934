use std::collections::BTreeMap;

use crate::models::Approach;

/// Per-approach suppression windows opened by emergency overrides.
///
/// Counts down once per scheduling cycle, not once per rendered second.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownTracker {
    remaining: BTreeMap<Approach, u32>,
}

impl CooldownTracker {
    pub fn new(approaches: &[Approach]) -> Self {
        Self {
            remaining: approaches.iter().map(|&a| (a, 0)).collect(),
        }
    }

    pub fn tick(&mut self) {
        for (approach, remaining) in self.remaining.iter_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                log::debug!("{} direction cooldown: {}", approach, remaining);
            }
        }
    }

    pub fn is_suppressed(&self, approach: Approach) -> bool {
        self.remaining(approach) > 0
    }

    /// Overwrites any window already open for `approach`.
    pub fn trigger(&mut self, approach: Approach, length: u32) {
        self.remaining.insert(approach, length);
    }

    pub fn remaining(&self, approach: Approach) -> u32 {
        self.remaining.get(&approach).copied().unwrap_or(0)
    }

    pub fn suppressed(&self) -> Vec<Approach> {
        self.remaining
            .iter()
            .filter(|(_, &r)| r > 0)
            .map(|(&a, _)| a)
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<Approach, u32> {
        self.remaining.clone()
    }
}
