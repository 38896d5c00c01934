use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::control_system::config::ScheduleConfig;
use crate::global_variables::{EMERGENCY_CLASSES, VEHICLE_CLASSES};
use crate::models::Approach;
use crate::perception::{PerceptionAdapter, PerceptionError};

/// One object reported by the upstream detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

/// Reads detector output from `<dir>/<approach>.json` (e.g. `south.json`),
/// each a JSON array of [`Detection`]. Files are re-read on every query so a
/// running controller picks up fresh frames.
#[derive(Debug, Clone)]
pub struct SceneFilePerception {
    dir: PathBuf,
    emergency_confidence: f32,
    vehicle_confidence: f32,
}

impl SceneFilePerception {
    pub fn new<P: AsRef<Path>>(
        dir: P,
        emergency_confidence: f32,
        vehicle_confidence: f32,
    ) -> Result<Self, PerceptionError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(PerceptionError::SceneSource {
                path: dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self {
            dir,
            emergency_confidence,
            vehicle_confidence,
        })
    }

    pub fn from_config<P: AsRef<Path>>(
        dir: P,
        config: &ScheduleConfig,
    ) -> Result<Self, PerceptionError> {
        Self::new(dir, config.emergency_confidence, config.vehicle_confidence)
    }

    pub fn scene_path(&self, approach: Approach) -> PathBuf {
        self.dir.join(format!("{}.json", approach.file_stem()))
    }

    fn read_detections(&self, approach: Approach) -> Result<Vec<Detection>, PerceptionError> {
        let path = self.scene_path(approach);
        let json = fs::read_to_string(&path).map_err(|e| PerceptionError::Unavailable {
            approach,
            reason: format!("could not read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&json).map_err(|e| PerceptionError::Unavailable {
            approach,
            reason: format!("could not parse {}: {}", path.display(), e),
        })
    }
}

pub fn is_emergency_vehicle(detection: &Detection, threshold: f32) -> bool {
    detection.confidence >= threshold
        && EMERGENCY_CLASSES
            .iter()
            .any(|class| detection.label.eq_ignore_ascii_case(class))
}

pub fn is_counted_vehicle(detection: &Detection, threshold: f32) -> bool {
    detection.confidence >= threshold
        && VEHICLE_CLASSES
            .iter()
            .any(|class| detection.label.eq_ignore_ascii_case(class))
}

impl PerceptionAdapter for SceneFilePerception {
    fn detect_emergency(&self, approach: Approach) -> Result<bool, PerceptionError> {
        let detections = self.read_detections(approach)?;
        let present = detections
            .iter()
            .any(|d| is_emergency_vehicle(d, self.emergency_confidence));
        if present {
            log::info!("Ambulance detected in {} direction", approach);
        }
        Ok(present)
    }

    fn count_vehicles(&self, approach: Approach) -> Result<u32, PerceptionError> {
        let detections = self.read_detections(approach)?;
        let count = detections
            .iter()
            .filter(|d| is_counted_vehicle(d, self.vehicle_confidence))
            .count();
        log::info!("{}: {} vehicles detected", approach, count);
        Ok(saturating_count(count))
    }
}

/// Huge detection lists clamp to `u32::MAX` so adaptive greens still hit their maximum.
fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
