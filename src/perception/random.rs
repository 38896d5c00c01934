use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::models::Approach;
use crate::perception::{PerceptionAdapter, PerceptionError};

/// Synthetic camera feed for demo runs: ambulances appear with a fixed
/// probability, queue lengths are drawn uniformly, and a small share of
/// frames are dropped.
#[derive(Debug)]
pub struct RandomPerception {
    rng: Mutex<StdRng>,
    emergency_probability: f64,
    max_vehicles: u32,
    dropout_probability: f64,
}

impl RandomPerception {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            emergency_probability: 0.05,
            max_vehicles: 12,
            dropout_probability: 0.02,
        }
    }

    pub fn with_emergency_probability(mut self, probability: f64) -> Self {
        self.emergency_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_dropout_probability(mut self, probability: f64) -> Self {
        self.dropout_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_vehicles(mut self, max_vehicles: u32) -> Self {
        self.max_vehicles = max_vehicles;
        self
    }

    fn frame_dropped(&self, rng: &mut StdRng, approach: Approach) -> Result<(), PerceptionError> {
        if rng.random_bool(self.dropout_probability) {
            return Err(PerceptionError::Unavailable {
                approach,
                reason: "camera frame dropped".to_string(),
            });
        }
        Ok(())
    }
}

impl PerceptionAdapter for RandomPerception {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.frame_dropped(&mut rng, approach)?;
        Ok(rng.random_bool(self.emergency_probability))
    }

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.frame_dropped(&mut rng, approach)?;
        Ok(rng.random_range(0..=self.max_vehicles))
    }
}
