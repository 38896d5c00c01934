use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{sleep, timeout_at, Instant};

use crate::communication::messages::{RunSummary, SchedulerEvent, StopReason};
use crate::control_system::config::ScheduleConfig;
use crate::control_system::cooldown::CooldownTracker;
use crate::control_system::duration_policy::DurationPolicy;
use crate::control_system::error::ConfigError;
use crate::models::{Approach, Phase, PhaseKind};
use crate::perception::{sense, PerceptionAdapter, SweepReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    NormalRotation {
        active_index: usize,
        remaining_seconds: u32,
    },
    EmergencyOverride {
        active: Approach,
        remaining_seconds: u32,
    },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Stopped,
}

/// Cloneable handle that asks a running scheduler to stop at its next tick boundary.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        log::info!("Traffic signal cycle stop requested");
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drives one intersection: cooldown tick, perception sweep, then either an
/// emergency override or one pass of the normal rotation, once per cycle.
pub struct SignalScheduler<P: PerceptionAdapter> {
    config: ScheduleConfig,
    policy: DurationPolicy,
    perception: Arc<P>,
    cooldowns: CooldownTracker,
    /// Queries that outlived their sweep's deadline, kept until they return.
    stalled: HashMap<Approach, JoinHandle<SweepReading>>,
    state: SchedulerState,
    current_phase: Option<Phase>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    cycle: u32,
    summary: RunSummary,
    consumer_gone: bool,
}

impl<P: PerceptionAdapter> SignalScheduler<P> {
    pub fn new(
        config: ScheduleConfig,
        perception: Arc<P>,
        events: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = DurationPolicy::from_config(&config);
        let cooldowns = CooldownTracker::new(&config.rotation_order);
        let (stop_tx, stop_rx) = watch::channel(false);

        log::info!(
            "Scheduler ready: sequence {}, policy {:?}, cooldown {} cycles",
            describe_order(&config.rotation_order),
            policy,
            config.cooldown_length
        );

        Ok(Self {
            config,
            policy,
            perception,
            cooldowns,
            stalled: HashMap::new(),
            state: SchedulerState::Idle,
            current_phase: None,
            events,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            cycle: 0,
            summary: RunSummary::default(),
            consumer_gone: false,
        })
    }

    /// Starts from a given cooldown state instead of all-clear.
    pub fn with_cooldowns(mut self, cooldowns: CooldownTracker) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.current_phase.as_ref()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Runs cycles until `max_cycles` is reached or a stop is requested.
    pub async fn run(&mut self) -> RunSummary {
        log::info!(
            "Running traffic signal cycle: {}",
            describe_order(&self.config.rotation_order)
        );
        let reason = loop {
            if let Some(max_cycles) = self.config.max_cycles {
                if self.summary.cycles_completed >= max_cycles {
                    break StopReason::MaxCyclesReached;
                }
            }
            if self.run_cycle().await == CycleOutcome::Stopped {
                break StopReason::StopRequested;
            }
        };
        self.finish(reason)
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.state == SchedulerState::Stopped || self.stop_requested() {
            self.halt();
            return CycleOutcome::Stopped;
        }

        self.cycle += 1;
        let cycle = self.cycle;
        self.cooldowns.tick();
        log::info!(
            "=== Cycle {}: checking all directions for emergency vehicles ===",
            cycle
        );
        self.emit(SchedulerEvent::CycleStarted {
            cycle,
            suppressed: self.cooldowns.suppressed(),
        });

        let readings = self.sweep().await;

        // Readings are in rotation order, so the first hit wins ties.
        let emergency = readings.iter().find(|r| r.emergency).map(|r| r.index);
        let outcome = match emergency {
            Some(index) => self.run_emergency(index).await,
            None => self.run_rotation(&readings).await,
        };

        if outcome == CycleOutcome::Completed {
            self.summary.cycles_completed += 1;
        }
        outcome
    }

    async fn sweep(&mut self) -> Vec<SweepReading> {
        let wants_counts = self.policy.needs_vehicle_counts();
        let deadline = Instant::now() + self.config.perception_timeout();

        let mut readings = Vec::with_capacity(self.config.rotation_order.len());
        let mut pending = Vec::new();
        for (index, &approach) in self.config.rotation_order.iter().enumerate() {
            if self.cooldowns.is_suppressed(approach) {
                log::info!(
                    "Skipping {} direction due to cooldown ({} cycles left)",
                    approach,
                    self.cooldowns.remaining(approach)
                );
                continue;
            }
            // At most one blocking query per approach; a hung adapter must not pile up threads.
            if let Some(stalled) = self.stalled.get(&approach) {
                if !stalled.is_finished() {
                    log::warn!(
                        "Perception for {} is still busy from an earlier sweep; treating it as clear",
                        approach
                    );
                    readings.push(SweepReading::clear(index, approach));
                    continue;
                }
                self.stalled.remove(&approach);
            }
            let perception = Arc::clone(&self.perception);
            let query = task::spawn_blocking(move || {
                sense(&*perception, index, approach, wants_counts)
            });
            pending.push((index, approach, query));
        }

        for (index, approach, mut query) in pending {
            let reading = match timeout_at(deadline, &mut query).await {
                Ok(Ok(reading)) => reading,
                Ok(Err(e)) => {
                    log::warn!("Perception task for {} failed: {}", approach, e);
                    SweepReading::clear(index, approach)
                }
                Err(_) => {
                    log::warn!(
                        "Perception for {} timed out; treating it as clear for this sweep",
                        approach
                    );
                    self.stalled.insert(approach, query);
                    SweepReading::clear(index, approach)
                }
            };
            readings.push(reading);
        }
        readings.sort_by_key(|r| r.index);
        readings
    }

    async fn run_emergency(&mut self, index: usize) -> CycleOutcome {
        let approach = self.config.rotation_order[index];
        log::warn!("AMBULANCE DETECTED IN {} DIRECTION", approach);
        self.emit(SchedulerEvent::EmergencyDetected {
            cycle: self.cycle,
            approach,
        });
        self.cooldowns.trigger(approach, self.config.cooldown_length);

        // Emergency greens always use the fixed duration, even in adaptive mode.
        let phase = Phase::emergency(
            &self.config.rotation_order,
            index,
            self.config.normal_duration,
        );
        self.summary.emergency_phases += 1;
        self.count_down(phase, index).await
    }

    async fn run_rotation(&mut self, readings: &[SweepReading]) -> CycleOutcome {
        let counts: HashMap<Approach, u32> = readings
            .iter()
            .map(|r| (r.approach, r.vehicle_count))
            .collect();
        let order = self.config.rotation_order.clone();

        let mut phases_run = 0;
        for (index, &approach) in order.iter().enumerate() {
            if self.cooldowns.is_suppressed(approach) {
                log::info!("Skipping {} direction due to cooldown", approach);
                continue;
            }
            let vehicle_count = counts.get(&approach).copied().unwrap_or(0);
            let duration = self.policy.green_duration(vehicle_count);
            log::info!(
                "{} signal activated for {} seconds ({} vehicles)",
                approach,
                duration,
                vehicle_count
            );

            let phase = Phase::normal(&order, index, duration);
            self.summary.normal_phases += 1;
            if self.count_down(phase, index).await == CycleOutcome::Stopped {
                return CycleOutcome::Stopped;
            }
            phases_run += 1;
        }

        if phases_run == 0 {
            log::warn!("Every approach is in cooldown; no normal phases this cycle");
            task::yield_now().await;
        }
        CycleOutcome::Completed
    }

    /// Emits one tick per second from `duration` down to 0 inclusive.
    async fn count_down(&mut self, mut phase: Phase, index: usize) -> CycleOutcome {
        if phase.check_conflicts() {
            log::error!(
                "Conflicting green signals: {:?}",
                phase.green_approaches()
            );
        }
        self.emit(SchedulerEvent::PhaseStarted(phase.clone()));

        for remaining in (0..=phase.duration_seconds).rev() {
            if self.stop_requested() {
                self.halt();
                return CycleOutcome::Stopped;
            }
            phase.remaining_seconds = remaining;
            self.state = match phase.kind {
                PhaseKind::Normal => SchedulerState::NormalRotation {
                    active_index: index,
                    remaining_seconds: remaining,
                },
                PhaseKind::Emergency => SchedulerState::EmergencyOverride {
                    active: phase.active,
                    remaining_seconds: remaining,
                },
            };
            log::debug!("{}: {}s remaining", phase.active, remaining);
            self.emit(SchedulerEvent::Tick(phase.tick_event(self.cycle)));
            self.summary.ticks_emitted += 1;
            self.current_phase = Some(phase.clone());

            if !self.pace().await {
                self.halt();
                return CycleOutcome::Stopped;
            }
        }

        log::info!("Switching from {} to {}", phase.active, phase.next);
        self.emit(SchedulerEvent::PhaseEnded {
            active: phase.active,
            next: phase.next,
            kind: phase.kind,
        });
        CycleOutcome::Completed
    }

    /// Waits out one tick. Returns false if a stop arrived meanwhile.
    async fn pace(&mut self) -> bool {
        let interval = self.config.tick_interval();
        if interval.is_zero() {
            task::yield_now().await;
        } else {
            tokio::select! {
                _ = sleep(interval) => {}
                _ = self.stop_rx.changed() => {}
            }
        }
        !self.stop_requested()
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn halt(&mut self) {
        if self.state != SchedulerState::Stopped {
            log::info!("Traffic signal cycle stopped");
        }
        self.state = SchedulerState::Stopped;
        self.current_phase = None;
    }

    fn finish(&mut self, reason: StopReason) -> RunSummary {
        self.halt();
        self.summary.stop_reason = Some(reason);
        let summary = self.summary.clone();
        log::info!("Scheduler finished: {:?}", summary);
        self.emit(SchedulerEvent::Finished(summary.clone()));
        summary
    }

    fn emit(&mut self, event: SchedulerEvent) {
        if self.events.send(event).is_err() && !self.consumer_gone {
            log::warn!("Display channel closed; continuing without visual feedback");
            self.consumer_gone = true;
        }
    }
}

fn describe_order(order: &[Approach]) -> String {
    order
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LightState;
    use crate::perception::ScriptedPerception;

    fn quick_config() -> ScheduleConfig {
        ScheduleConfig {
            normal_duration: 2,
            tick_interval_ms: 0,
            ..ScheduleConfig::default()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn starts_idle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler =
            SignalScheduler::new(quick_config(), Arc::new(ScriptedPerception::new()), tx).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.current_phase().is_none());
    }

    #[tokio::test]
    async fn invalid_config_never_builds_a_scheduler() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = ScheduleConfig {
            rotation_order: vec![Approach::North, Approach::North],
            ..quick_config()
        };
        let result = SignalScheduler::new(config, Arc::new(ScriptedPerception::new()), tx);
        assert_eq!(
            result.err().and_then(|e| e.field()),
            Some("rotation_order")
        );
    }

    #[tokio::test]
    async fn normal_cycle_visits_every_approach_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler =
            SignalScheduler::new(quick_config(), Arc::new(ScriptedPerception::new()), tx).unwrap();

        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Completed);

        let started: Vec<Approach> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SchedulerEvent::PhaseStarted(phase) => Some(phase.active),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![Approach::East, Approach::South, Approach::West, Approach::North]
        );
        assert_eq!(scheduler.summary().normal_phases, 4);
        assert_eq!(scheduler.summary().ticks_emitted, 12);
    }

    #[tokio::test]
    async fn every_tick_has_one_green_and_a_yellow_successor() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler =
            SignalScheduler::new(quick_config(), Arc::new(ScriptedPerception::new()), tx).unwrap();
        scheduler.run_cycle().await;

        let order = scheduler.config().rotation_order.clone();
        for event in drain(&mut rx) {
            if let SchedulerEvent::Tick(tick) = event {
                let greens: Vec<_> = tick
                    .approach_colors
                    .iter()
                    .filter(|(_, &c)| c == LightState::Green)
                    .collect();
                assert_eq!(greens.len(), 1);
                let index = order.iter().position(|&a| a == tick.active).unwrap();
                let next = order[(index + 1) % order.len()];
                assert_eq!(tick.approach_colors[&next], LightState::Yellow);
            }
        }
    }

    #[tokio::test]
    async fn yellow_duration_does_not_add_an_interval() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = ScheduleConfig {
            yellow_duration: 7,
            ..quick_config()
        };
        let mut scheduler =
            SignalScheduler::new(config, Arc::new(ScriptedPerception::new()), tx).unwrap();
        scheduler.run_cycle().await;
        // Four phases of normal_duration 2, i.e. 3 ticks each.
        assert_eq!(scheduler.summary().ticks_emitted, 12);
    }

    #[tokio::test]
    async fn lowest_rotation_index_wins_simultaneous_emergencies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Rotation indices 2, 0 and 3 all report an ambulance.
        let perception = ScriptedPerception::new()
            .with_emergencies(Approach::West, &[true])
            .with_emergencies(Approach::East, &[true])
            .with_emergencies(Approach::North, &[true]);
        let mut scheduler =
            SignalScheduler::new(quick_config(), Arc::new(perception), tx).unwrap();

        scheduler.run_cycle().await;

        let detected: Vec<Approach> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SchedulerEvent::EmergencyDetected { approach, .. } => Some(approach),
                _ => None,
            })
            .collect();
        assert_eq!(detected, vec![Approach::East]);
        assert_eq!(scheduler.summary().emergency_phases, 1);
        assert_eq!(scheduler.summary().normal_phases, 0);
    }

    #[tokio::test]
    async fn stop_before_a_cycle_is_terminal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler =
            SignalScheduler::new(quick_config(), Arc::new(ScriptedPerception::new()), tx).unwrap();
        scheduler.stop_handle().stop();

        let summary = scheduler.run().await;
        assert_eq!(summary.stop_reason, Some(StopReason::StopRequested));
        assert_eq!(summary.ticks_emitted, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(matches!(
            drain(&mut rx).last(),
            Some(SchedulerEvent::Finished(_))
        ));
    }

    #[tokio::test]
    async fn max_cycles_bounds_the_run() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = ScheduleConfig {
            max_cycles: Some(2),
            ..quick_config()
        };
        let mut scheduler =
            SignalScheduler::new(config, Arc::new(ScriptedPerception::new()), tx).unwrap();
        let summary = scheduler.run().await;
        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.stop_reason, Some(StopReason::MaxCyclesReached));
    }

    #[tokio::test]
    async fn dropped_display_does_not_stop_scheduling() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut scheduler =
            SignalScheduler::new(quick_config(), Arc::new(ScriptedPerception::new()), tx).unwrap();
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Completed);
        assert_eq!(scheduler.summary().normal_phases, 4);
    }
}
