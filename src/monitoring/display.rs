use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::communication::messages::{SchedulerEvent, TickEvent};
use crate::monitoring::error::RenderError;

/// Consumer of scheduler events. Purely observational: errors are logged by
/// the display loop and never fed back to the scheduler.
pub trait DisplayAdapter: Send {
    fn name(&self) -> &'static str;

    fn handle(&mut self, event: &SchedulerEvent) -> Result<(), RenderError>;

    /// Called once when the scheduler finishes or the channel closes.
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Prints the signal board to stdout, one line per tick.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl DisplayAdapter for ConsoleDisplay {
    fn name(&self) -> &'static str {
        "console"
    }

    fn handle(&mut self, event: &SchedulerEvent) -> Result<(), RenderError> {
        match event {
            SchedulerEvent::CycleStarted { cycle, suppressed } => {
                println!("\n=== Cycle {} ===", cycle);
                for approach in suppressed {
                    println!("{} direction in cooldown", approach);
                }
            }
            SchedulerEvent::EmergencyDetected { approach, .. } => {
                println!("\n🚨 AMBULANCE DETECTED IN {} DIRECTION!", approach);
            }
            SchedulerEvent::PhaseStarted(phase) => {
                println!(
                    "\n{} phase: {} green for {} seconds",
                    phase.kind, phase.active, phase.duration_seconds
                );
            }
            SchedulerEvent::Tick(tick) => println!("{}", render_board(tick)),
            SchedulerEvent::PhaseEnded { active, next, .. } => {
                println!("Switching from {} to {}", active, next);
            }
            SchedulerEvent::Finished(summary) => {
                println!(
                    "\nTraffic signal cycle finished after {} cycles ({} normal, {} emergency phases)",
                    summary.cycles_completed, summary.normal_phases, summary.emergency_phases
                );
            }
        }
        Ok(())
    }
}

/// One line describing every head, e.g. `East: GREEN GO 7s | South: YELLOW NEXT 7s | West: RED STOP`.
pub fn render_board(tick: &TickEvent) -> String {
    tick.approach_colors
        .iter()
        .map(|(approach, color)| {
            let status = tick
                .approach_statuses
                .get(approach)
                .map(|s| s.to_string())
                .unwrap_or_default();
            match tick.approach_countdowns.get(approach).copied().flatten() {
                Some(seconds) => format!("{}: {} {} {}s", approach, color, status, seconds),
                None => format!("{}: {} {}", approach, color, status),
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Feeds every event to each adapter until the scheduler finishes or drops its sender.
pub async fn run_display(
    mut events: mpsc::UnboundedReceiver<SchedulerEvent>,
    mut adapters: Vec<Box<dyn DisplayAdapter>>,
) {
    while let Some(event) = events.recv().await {
        let finished = matches!(event, SchedulerEvent::Finished(_));
        for adapter in adapters.iter_mut() {
            if let Err(e) = adapter.handle(&event) {
                log::warn!("{} display unavailable: {}", adapter.name(), e);
            }
        }
        if finished {
            break;
        }
    }
    for adapter in adapters.iter_mut() {
        if let Err(e) = adapter.finish() {
            log::warn!("{} display could not finish: {}", adapter.name(), e);
        }
    }
}

pub fn spawn_display(
    events: mpsc::UnboundedReceiver<SchedulerEvent>,
    adapters: Vec<Box<dyn DisplayAdapter>>,
) -> JoinHandle<()> {
    tokio::spawn(run_display(events, adapters))
}
