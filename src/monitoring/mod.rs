pub mod accident_monitor;
pub mod display;
pub mod error;
pub mod notifier;
pub mod tick_log;
pub mod timeline;

pub use accident_monitor::{AccidentFrame, AccidentMonitor};
pub use display::{spawn_display, ConsoleDisplay, DisplayAdapter};
pub use error::{NotifyError, RenderError};
pub use notifier::{AmqpNotifier, LogNotifier, NotificationAdapter};
pub use tick_log::CsvTickLog;
pub use timeline::PhaseTimeline;
