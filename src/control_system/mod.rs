pub mod config;
pub mod cooldown;
pub mod duration_policy;
pub mod error;
pub mod signal_scheduler;

pub use config::{DurationMode, ScheduleConfig};
pub use cooldown::CooldownTracker;
pub use duration_policy::DurationPolicy;
pub use error::ConfigError;
pub use signal_scheduler::{CycleOutcome, SchedulerState, SignalScheduler, StopHandle};
