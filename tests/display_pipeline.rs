use signal_preemption::control_system::{ScheduleConfig, SignalScheduler};
use signal_preemption::models::Approach;
use signal_preemption::monitoring::tick_log::read_tick_log;
use signal_preemption::monitoring::{spawn_display, CsvTickLog, DisplayAdapter};
use signal_preemption::perception::ScriptedPerception;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::test]
async fn tick_log_records_every_emitted_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");

    let config = ScheduleConfig {
        rotation_order: vec![Approach::North, Approach::South],
        normal_duration: 1,
        tick_interval_ms: 0,
        max_cycles: Some(2),
        ..ScheduleConfig::default()
    };
    let perception =
        ScriptedPerception::new().with_emergencies(Approach::South, &[false, true]);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut scheduler = SignalScheduler::new(config, Arc::new(perception), tx).unwrap();

    let adapters: Vec<Box<dyn DisplayAdapter>> = vec![Box::new(CsvTickLog::new(&path))];
    let display = spawn_display(rx, adapters);

    let summary = scheduler.run().await;
    drop(scheduler);
    display.await.unwrap();

    // Cycle 1: two normal phases; cycle 2: one emergency phase on South.
    assert_eq!(summary.normal_phases, 2);
    assert_eq!(summary.emergency_phases, 1);

    let records = read_tick_log(&path).unwrap();
    assert_eq!(records.len() as u64, summary.ticks_emitted);
    assert_eq!(records.len(), 6);
    let last = records.last().unwrap();
    assert_eq!(last.cycle, 2);
    assert_eq!(last.kind, "EMERGENCY");
    assert_eq!(last.north.as_deref(), Some("RED NEXT 0"));
    assert_eq!(last.east, None);
}
