// simulation_main.rs
use signal_preemption::control_system::{ScheduleConfig, SignalScheduler};
use signal_preemption::monitoring::{spawn_display, ConsoleDisplay, DisplayAdapter};
use signal_preemption::perception::RandomPerception;
use std::process;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Starting simulated intersection...");

    let config = match ScheduleConfig::from_env_or(ScheduleConfig::adaptive()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let perception = RandomPerception::new(42).with_emergency_probability(0.1);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut scheduler = match SignalScheduler::new(config, Arc::new(perception), tx) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let adapters: Vec<Box<dyn DisplayAdapter>> = vec![Box::new(ConsoleDisplay)];
    let display = spawn_display(rx, adapters);

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    scheduler.run().await;
    drop(scheduler);
    if let Err(e) = display.await {
        eprintln!("Display task error: {}", e);
    }
}
