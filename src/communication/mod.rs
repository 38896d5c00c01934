pub mod messages;

pub use messages::{EmergencyRaised, RunSummary, SchedulerEvent, StopReason, TickEvent};
