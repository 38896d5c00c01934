use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::communication::messages::{current_timestamp, EmergencyRaised};
use crate::control_system::config::ScheduleConfig;

/// One classifier output for a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccidentFrame {
    pub frame: u64,
    pub confidence: f32,
}

/// Watches accident-classifier confidences and raises exactly once, on the
/// first reading strictly above the threshold.
#[derive(Debug, Clone)]
pub struct AccidentMonitor {
    threshold: f32,
    raised: bool,
}

impl AccidentMonitor {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            raised: false,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.accident_confidence)
    }

    pub fn has_raised(&self) -> bool {
        self.raised
    }

    pub fn observe(&mut self, frame: &AccidentFrame) -> Option<EmergencyRaised> {
        if self.raised || frame.confidence.is_nan() || frame.confidence <= self.threshold {
            return None;
        }
        self.raised = true;
        log::warn!(
            "Accident detected at frame {} (confidence {:.2})",
            frame.frame,
            frame.confidence
        );
        Some(EmergencyRaised {
            timestamp: current_timestamp(),
            confidence: frame.confidence,
            frame: Some(frame.frame),
        })
    }
}

/// Loads `frame,confidence` rows produced by the upstream classifier.
pub fn read_accident_frames<P: AsRef<Path>>(path: P) -> Result<Vec<AccidentFrame>, csv::Error> {
    let mut rdr = csv::Reader::from_path(path)?;
    rdr.deserialize().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame: u64, confidence: f32) -> AccidentFrame {
        AccidentFrame { frame, confidence }
    }

    #[test]
    fn raises_only_once() {
        let mut monitor = AccidentMonitor::new(0.9);
        assert!(monitor.observe(&frame(1, 0.2)).is_none());
        let raised = monitor.observe(&frame(2, 0.95)).unwrap();
        assert_eq!(raised.frame, Some(2));
        assert!(monitor.observe(&frame(3, 0.99)).is_none());
        assert!(monitor.has_raised());
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut monitor = AccidentMonitor::new(0.9);
        assert!(monitor.observe(&frame(1, 0.9)).is_none());
        assert!(!monitor.has_raised());
    }

    #[test]
    fn nan_confidence_never_raises() {
        let mut monitor = AccidentMonitor::new(0.9);
        assert!(monitor.observe(&frame(1, f32::NAN)).is_none());
        assert!(!monitor.has_raised());
        let raised = monitor.observe(&frame(2, 0.95)).unwrap();
        assert_eq!(raised.frame, Some(2));
    }

    #[test]
    fn nan_row_in_csv_does_not_mask_a_later_accident() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, "frame,confidence\n1,NaN\n2,0.95\n").unwrap();

        let mut monitor = AccidentMonitor::new(0.9);
        let raised: Vec<EmergencyRaised> = read_accident_frames(&path)
            .unwrap()
            .iter()
            .filter_map(|f| monitor.observe(f))
            .collect();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].frame, Some(2));
        assert_eq!(raised[0].confidence, 0.95);
    }

    #[test]
    fn frames_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, "frame,confidence\n1,0.10\n2,0.93\n").unwrap();
        let frames = read_accident_frames(&path).unwrap();
        assert_eq!(frames, vec![frame(1, 0.10), frame(2, 0.93)]);
    }
}
