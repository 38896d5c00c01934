use signal_preemption::control_system::{ScheduleConfig, SignalScheduler};
use signal_preemption::global_variables::{ENV_SCENE_DIR, PHASE_TIMELINE_PNG, TICK_LOG_CSV};
use signal_preemption::monitoring::tick_log::read_tick_log;
use signal_preemption::monitoring::{
    spawn_display, ConsoleDisplay, CsvTickLog, DisplayAdapter, PhaseTimeline,
};
use signal_preemption::perception::SceneFilePerception;
use std::env;
use std::process;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Starting traffic signal controller...");

    let config = match ScheduleConfig::from_env_or(ScheduleConfig::default()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let scene_dir = env::var(ENV_SCENE_DIR).unwrap_or_else(|_| "scenes".to_string());
    let perception = match SceneFilePerception::from_config(&scene_dir, &config) {
        Ok(perception) => perception,
        Err(e) => {
            eprintln!("Perception error: {}", e);
            process::exit(1);
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut scheduler = match SignalScheduler::new(config, Arc::new(perception), tx) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let adapters: Vec<Box<dyn DisplayAdapter>> = vec![
        Box::new(ConsoleDisplay),
        Box::new(CsvTickLog::new(TICK_LOG_CSV)),
        Box::new(PhaseTimeline::new(PHASE_TIMELINE_PNG)),
    ];
    let display = spawn_display(rx, adapters);

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nTraffic signal cycle stopped by user");
            stop.stop();
        }
    });

    let summary = scheduler.run().await;
    drop(scheduler);
    if let Err(e) = display.await {
        eprintln!("Display task error: {}", e);
    }

    println!("Run summary: {:?}", summary);
    match read_tick_log(TICK_LOG_CSV) {
        Ok(records) => println!("Tick log: {} records in {}", records.len(), TICK_LOG_CSV),
        Err(e) => eprintln!("Error reading tick log: {}", e),
    }
}
