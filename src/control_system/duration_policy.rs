use crate::control_system::config::{DurationMode, ScheduleConfig};

/// Converts perception output into a green-phase duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    Fixed {
        normal_duration: u32,
    },
    Adaptive {
        cars_per_second: u32,
        min_green_time: u32,
        max_green_time: u32,
    },
}

impl DurationPolicy {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        match config.duration_mode {
            DurationMode::Fixed => DurationPolicy::Fixed {
                normal_duration: config.normal_duration,
            },
            DurationMode::Adaptive {
                cars_per_second,
                min_green_time,
                max_green_time,
            } => DurationPolicy::Adaptive {
                cars_per_second,
                min_green_time,
                max_green_time,
            },
        }
    }

    /// Green time for an approach holding `vehicle_count` vehicles.
    /// An empty approach still gets `min_green_time` in adaptive mode.
    pub fn green_duration(&self, vehicle_count: u32) -> u32 {
        match *self {
            DurationPolicy::Fixed { normal_duration } => normal_duration,
            DurationPolicy::Adaptive {
                cars_per_second,
                min_green_time,
                max_green_time,
            } => vehicle_count
                .saturating_mul(cars_per_second)
                .clamp(min_green_time, max_green_time),
        }
    }

    pub fn needs_vehicle_counts(&self) -> bool {
        matches!(self, DurationPolicy::Adaptive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Approach;
    use std::collections::HashMap;

    fn adaptive() -> DurationPolicy {
        DurationPolicy::Adaptive {
            cars_per_second: 5,
            min_green_time: 10,
            max_green_time: 30,
        }
    }

    #[test]
    fn fixed_ignores_vehicle_count() {
        let policy = DurationPolicy::Fixed { normal_duration: 10 };
        assert_eq!(policy.green_duration(0), 10);
        assert_eq!(policy.green_duration(500), 10);
        assert!(!policy.needs_vehicle_counts());
    }

    #[test]
    fn adaptive_clamps_at_both_ends() {
        let policy = adaptive();
        assert_eq!(policy.green_duration(0), 10);
        assert_eq!(policy.green_duration(u32::MAX), 30);
        assert!(policy.needs_vehicle_counts());
    }

    #[test]
    fn adaptive_is_non_decreasing() {
        let policy = adaptive();
        let mut previous = 0;
        for count in 0..100 {
            let duration = policy.green_duration(count);
            assert!(duration >= previous);
            previous = duration;
        }
    }

    #[test]
    fn adaptive_durations_for_a_four_way_sample() {
        let policy = adaptive();
        let counts = HashMap::from([
            (Approach::North, 0),
            (Approach::East, 12),
            (Approach::South, 3),
            (Approach::West, 0),
        ]);
        let durations: HashMap<Approach, u32> = counts
            .iter()
            .map(|(&a, &c)| (a, policy.green_duration(c)))
            .collect();
        assert_eq!(durations[&Approach::North], 10);
        assert_eq!(durations[&Approach::East], 30);
        assert_eq!(durations[&Approach::South], 15);
        assert_eq!(durations[&Approach::West], 10);
    }

    #[test]
    fn built_from_config_mode() {
        let policy = DurationPolicy::from_config(&ScheduleConfig::adaptive());
        assert_eq!(policy, adaptive());
        let policy = DurationPolicy::from_config(&ScheduleConfig::default());
        assert_eq!(policy, DurationPolicy::Fixed { normal_duration: 10 });
    }
}
