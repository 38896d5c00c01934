use signal_preemption::control_system::ScheduleConfig;
use signal_preemption::global_variables::{ENV_ACCIDENT_FRAMES, ENV_NOTIFY_AMQP};
use signal_preemption::monitoring::accident_monitor::read_accident_frames;
use signal_preemption::monitoring::notifier::dispatch;
use signal_preemption::monitoring::{
    AccidentMonitor, AmqpNotifier, LogNotifier, NotificationAdapter,
};
use std::env;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Starting accident monitoring...");

    let config = match ScheduleConfig::from_env_or(ScheduleConfig::default()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let frames_path =
        env::var(ENV_ACCIDENT_FRAMES).unwrap_or_else(|_| "accident_frames.csv".to_string());
    let frames = match read_accident_frames(&frames_path) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("Could not read accident frames from {}: {}", frames_path, e);
            process::exit(1);
        }
    };

    let mut notifiers: Vec<Arc<dyn NotificationAdapter>> = vec![Arc::new(LogNotifier)];
    if env::var(ENV_NOTIFY_AMQP).is_ok() {
        notifiers.push(Arc::new(AmqpNotifier::default()));
    }

    let mut monitor = AccidentMonitor::from_config(&config);
    for frame in &frames {
        if let Some(event) = monitor.observe(frame) {
            let failures = dispatch(&notifiers, &event).await;
            if failures > 0 {
                eprintln!("{} notifier(s) failed to deliver the alert", failures);
            }
        }
    }

    println!(
        "Processed {} frames; accident {}",
        frames.len(),
        if monitor.has_raised() { "reported" } else { "not detected" }
    );
}
