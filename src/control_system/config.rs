use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::control_system::error::ConfigError;
use crate::global_variables::{
    DEFAULT_ACCIDENT_CONFIDENCE, DEFAULT_ADAPTIVE_MAX_CYCLES, DEFAULT_CARS_PER_SECOND,
    DEFAULT_COOLDOWN_LENGTH, DEFAULT_EMERGENCY_CONFIDENCE, DEFAULT_MAX_GREEN_TIME,
    DEFAULT_MIN_GREEN_TIME, DEFAULT_PERCEPTION_TIMEOUT_MS, DEFAULT_SIGNAL_DURATION,
    DEFAULT_TICK_INTERVAL_MS, DEFAULT_VEHICLE_CONFIDENCE, DEFAULT_YELLOW_DURATION,
    ENV_CONFIG_PATH,
};
use crate::models::Approach;

/// How green-phase durations are sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DurationMode {
    /// Every approach gets `normal_duration`.
    Fixed,
    /// Duration scales with the vehicle count sampled during the sweep.
    Adaptive {
        cars_per_second: u32,
        min_green_time: u32,
        max_green_time: u32,
    },
}

impl Default for DurationMode {
    fn default() -> Self {
        DurationMode::Fixed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cyclic order in which approaches receive the green.
    pub rotation_order: Vec<Approach>,
    pub duration_mode: DurationMode,
    /// Fixed green duration; also used for every emergency phase regardless of mode.
    pub normal_duration: u32,
    /// Validated but not timed: YELLOW marks the next approach during the active
    /// countdown, there is no separate yellow interval.
    pub yellow_duration: u32,
    /// Cycles an approach is suppressed for after it triggers an emergency override.
    pub cooldown_length: u32,
    /// `None` runs until a stop is requested.
    pub max_cycles: Option<u32>,
    pub emergency_confidence: f32,
    pub vehicle_confidence: f32,
    pub accident_confidence: f32,
    pub tick_interval_ms: u64,
    pub perception_timeout_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            rotation_order: vec![
                Approach::East,
                Approach::South,
                Approach::West,
                Approach::North,
            ],
            duration_mode: DurationMode::Fixed,
            normal_duration: DEFAULT_SIGNAL_DURATION,
            yellow_duration: DEFAULT_YELLOW_DURATION,
            cooldown_length: DEFAULT_COOLDOWN_LENGTH,
            max_cycles: None,
            emergency_confidence: DEFAULT_EMERGENCY_CONFIDENCE,
            vehicle_confidence: DEFAULT_VEHICLE_CONFIDENCE,
            accident_confidence: DEFAULT_ACCIDENT_CONFIDENCE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            perception_timeout_ms: DEFAULT_PERCEPTION_TIMEOUT_MS,
        }
    }
}

impl ScheduleConfig {
    /// Vehicle-count variant: North first, clamped adaptive greens, five cycles.
    pub fn adaptive() -> Self {
        Self {
            rotation_order: Approach::ALL.to_vec(),
            duration_mode: DurationMode::Adaptive {
                cars_per_second: DEFAULT_CARS_PER_SECOND,
                min_green_time: DEFAULT_MIN_GREEN_TIME,
                max_green_time: DEFAULT_MAX_GREEN_TIME,
            },
            max_cycles: Some(DEFAULT_ADAPTIVE_MAX_CYCLES),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ScheduleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded schedule configuration from {}", path.display());
        Self::from_json(&json)
    }

    /// Loads the file named by `SIGNAL_CONFIG`, or validates `fallback` when it is unset.
    pub fn from_env_or(fallback: ScheduleConfig) -> Result<Self, ConfigError> {
        match env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::load(path),
            Err(_) => {
                fallback.validate()?;
                Ok(fallback)
            }
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn perception_timeout(&self) -> Duration {
        Duration::from_millis(self.perception_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotation_order.len() < 2 {
            return Err(ConfigError::invalid(
                "rotation_order",
                format!(
                    "needs at least 2 approaches, got {}",
                    self.rotation_order.len()
                ),
            ));
        }
        let mut seen = HashSet::new();
        for approach in &self.rotation_order {
            if !seen.insert(approach) {
                return Err(ConfigError::invalid(
                    "rotation_order",
                    format!("{} appears more than once", approach),
                ));
            }
        }

        if self.normal_duration == 0 {
            return Err(ConfigError::invalid("normal_duration", "must be positive"));
        }
        if self.yellow_duration == 0 {
            return Err(ConfigError::invalid("yellow_duration", "must be positive"));
        }
        if self.max_cycles == Some(0) {
            return Err(ConfigError::invalid(
                "max_cycles",
                "must be positive when set",
            ));
        }
        if self.perception_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "perception_timeout_ms",
                "must be positive",
            ));
        }

        if let DurationMode::Adaptive {
            cars_per_second,
            min_green_time,
            max_green_time,
        } = self.duration_mode
        {
            if cars_per_second == 0 {
                return Err(ConfigError::invalid("cars_per_second", "must be positive"));
            }
            if min_green_time == 0 {
                return Err(ConfigError::invalid("min_green_time", "must be positive"));
            }
            if max_green_time < min_green_time {
                return Err(ConfigError::invalid(
                    "max_green_time",
                    format!(
                        "{} is below min_green_time {}",
                        max_green_time, min_green_time
                    ),
                ));
            }
        }

        for (field, value) in [
            ("emergency_confidence", self.emergency_confidence),
            ("vehicle_confidence", self.vehicle_confidence),
            ("accident_confidence", self.accident_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("{} is outside 0.0..=1.0", value),
                ));
            }
        }

        Ok(())
    }
}
