use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::models::Approach;
use crate::perception::{PerceptionAdapter, PerceptionError};

/// Replays pre-set observations. Each emergency query pops the next scripted
/// answer for that approach; once the script runs out the approach reads clear.
#[derive(Debug, Default)]
pub struct ScriptedPerception {
    emergencies: Mutex<HashMap<Approach, VecDeque<bool>>>,
    counts: HashMap<Approach, u32>,
    failing: HashSet<Approach>,
    delays: HashMap<Approach, Duration>,
    emergency_queries: Mutex<Vec<Approach>>,
    count_queries: Mutex<Vec<Approach>>,
}

impl ScriptedPerception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emergencies(self, approach: Approach, answers: &[bool]) -> Self {
        self.emergencies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(approach, answers.iter().copied().collect());
        self
    }

    pub fn with_count(mut self, approach: Approach, count: u32) -> Self {
        self.counts.insert(approach, count);
        self
    }

    pub fn failing(mut self, approach: Approach) -> Self {
        self.failing.insert(approach);
        self
    }

    /// Makes every query for `approach` block for `delay` before answering.
    pub fn with_delay(mut self, approach: Approach, delay: Duration) -> Self {
        self.delays.insert(approach, delay);
        self
    }

    /// Approaches asked about emergencies, in the order the questions arrived.
    pub fn emergency_queries(&self) -> Vec<Approach> {
        self.emergency_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count_queries(&self) -> Vec<Approach> {
        self.count_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check(&self, approach: Approach) -> Result<(), PerceptionError> {
        if let Some(delay) = self.delays.get(&approach) {
            thread::sleep(*delay);
        }
        if self.failing.contains(&approach) {
            return Err(PerceptionError::Unavailable {
                approach,
                reason: "no frame available".to_string(),
            });
        }
        Ok(())
    }
}

impl PerceptionAdapter for ScriptedPerception {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError> {
        self.emergency_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(approach);
        self.check(approach)?;
        let mut emergencies = self.emergencies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(emergencies
            .get_mut(&approach)
            .and_then(|answers| answers.pop_front())
            .unwrap_or(false))
    }

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError> {
        self.count_queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(approach);
        self.check(approach)?;
        Ok(self.counts.get(&approach).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_consumed_then_reads_clear() {
        let perception =
            ScriptedPerception::new().with_emergencies(Approach::South, &[true, false, true]);
        let answers: Vec<bool> = (0..4)
            .map(|_| perception.detect_emergency(Approach::South).unwrap())
            .collect();
        assert_eq!(answers, vec![true, false, true, false]);
        assert_eq!(perception.emergency_queries().len(), 4);
    }

    #[test]
    fn failing_approach_reports_unavailable() {
        let perception = ScriptedPerception::new().failing(Approach::North);
        assert!(matches!(
            perception.count_vehicles(Approach::North),
            Err(PerceptionError::Unavailable { approach: Approach::North, .. })
        ));
    }
}
