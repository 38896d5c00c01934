pub mod random;
pub mod scene_file;
pub mod scripted;

use std::sync::Arc;
use thiserror::Error;

use crate::models::Approach;

pub use random::RandomPerception;
pub use scene_file::{Detection, SceneFilePerception};
pub use scripted::ScriptedPerception;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerceptionError {
    #[error("perception unavailable for {approach}: {reason}")]
    Unavailable { approach: Approach, reason: String },

    #[error("scene directory {path} is not usable: {reason}")]
    SceneSource { path: String, reason: String },
}

/// Source of per-approach observations. Implementations may block (model
/// inference, file reads); the scheduler runs them on the blocking pool.
pub trait PerceptionAdapter: Send + Sync + 'static {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError>;

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError>;
}

impl<P: PerceptionAdapter + ?Sized> PerceptionAdapter for Arc<P> {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError> {
        (**self).detect_emergency(approach)
    }

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError> {
        (**self).count_vehicles(approach)
    }
}

impl<P: PerceptionAdapter + ?Sized> PerceptionAdapter for Box<P> {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError> {
        (**self).detect_emergency(approach)
    }

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError> {
        (**self).count_vehicles(approach)
    }
}

/// What one sweep learned about one approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReading {
    /// Position in the rotation order.
    pub index: usize,
    pub approach: Approach,
    pub emergency: bool,
    pub vehicle_count: u32,
}

impl SweepReading {
    /// Reading used when the adapter could not answer in time.
    pub fn clear(index: usize, approach: Approach) -> Self {
        Self {
            index,
            approach,
            emergency: false,
            vehicle_count: 0,
        }
    }
}

/// Queries one approach, degrading each failed question to "no emergency" / "zero vehicles".
pub fn sense<P: PerceptionAdapter + ?Sized>(
    perception: &P,
    index: usize,
    approach: Approach,
    wants_counts: bool,
) -> SweepReading {
    let emergency = match perception.detect_emergency(approach) {
        Ok(present) => present,
        Err(e) => {
            log::warn!("{}; treating {} as clear for this sweep", e, approach);
            false
        }
    };
    let vehicle_count = if wants_counts {
        match perception.count_vehicles(approach) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("{}; counting 0 vehicles on {} for this sweep", e, approach);
                0
            }
        }
    } else {
        0
    };
    SweepReading {
        index,
        approach,
        emergency,
        vehicle_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_queries_degrade_independently() {
        let perception = ScriptedPerception::new()
            .with_count(Approach::East, 7)
            .failing(Approach::West);

        let east = sense(&perception, 0, Approach::East, true);
        assert!(!east.emergency);
        assert_eq!(east.vehicle_count, 7);

        let west = sense(&perception, 2, Approach::West, true);
        assert_eq!(west, SweepReading::clear(2, Approach::West));
    }

    #[test]
    fn counts_are_skipped_in_fixed_mode() {
        let perception = ScriptedPerception::new().with_count(Approach::East, 7);
        let reading = sense(&perception, 0, Approach::East, false);
        assert_eq!(reading.vehicle_count, 0);
        assert!(perception.count_queries().is_empty());
    }
}
