use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::communication::messages::{current_timestamp, SchedulerEvent, TickEvent};
use crate::models::Approach;
use crate::monitoring::display::DisplayAdapter;
use crate::monitoring::error::RenderError;

/// One CSV row per tick. Approach columns are empty when the approach is not in the rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub timestamp: u64,
    pub cycle: u32,
    pub kind: String,
    pub active: String,
    pub remaining_seconds: u32,
    pub north: Option<String>,
    pub east: Option<String>,
    pub south: Option<String>,
    pub west: Option<String>,
}

impl TickRecord {
    pub fn from_tick(tick: &TickEvent, timestamp: u64) -> Self {
        Self {
            timestamp,
            cycle: tick.cycle,
            kind: tick.kind.to_string(),
            active: tick.active.to_string(),
            remaining_seconds: tick.remaining_seconds,
            north: head_summary(tick, Approach::North),
            east: head_summary(tick, Approach::East),
            south: head_summary(tick, Approach::South),
            west: head_summary(tick, Approach::West),
        }
    }
}

fn head_summary(tick: &TickEvent, approach: Approach) -> Option<String> {
    let color = tick.approach_colors.get(&approach)?;
    let status = tick
        .approach_statuses
        .get(&approach)
        .map(|s| s.to_string())
        .unwrap_or_default();
    Some(match tick.approach_countdowns.get(&approach).copied().flatten() {
        Some(seconds) => format!("{} {} {}", color, status, seconds),
        None => format!("{} {}", color, status),
    })
}

/// Appends tick rows to a CSV file; the header is only written for a new file.
pub struct CsvTickLog {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvTickLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<File>, RenderError> {
        if self.writer.is_none() {
            let file_exists = self.path.exists();
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)?;
            let writer = csv::WriterBuilder::new()
                .has_headers(!file_exists)
                .from_writer(file);
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .ok_or_else(|| RenderError::Unavailable("tick log writer missing".to_string()))
    }
}

impl DisplayAdapter for CsvTickLog {
    fn name(&self) -> &'static str {
        "csv tick log"
    }

    fn handle(&mut self, event: &SchedulerEvent) -> Result<(), RenderError> {
        if let SchedulerEvent::Tick(tick) = event {
            let record = TickRecord::from_tick(tick, current_timestamp());
            self.writer()?.serialize(record)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            log::info!("Tick log written to {}", self.path.display());
        }
        Ok(())
    }
}

pub fn read_tick_log<P: AsRef<Path>>(path: P) -> Result<Vec<TickRecord>, RenderError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: TickRecord = result?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;

    fn tick(remaining: u32) -> SchedulerEvent {
        let order = [Approach::East, Approach::South, Approach::West, Approach::North];
        let mut phase = Phase::emergency(&order, 1, 10);
        phase.remaining_seconds = remaining;
        SchedulerEvent::Tick(phase.tick_event(3))
    }

    #[test]
    fn ticks_are_appended_across_sessions_with_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticks.csv");

        let mut log = CsvTickLog::new(&path);
        log.handle(&tick(10)).unwrap();
        log.handle(&tick(9)).unwrap();
        log.finish().unwrap();

        let mut log = CsvTickLog::new(&path);
        log.handle(&tick(8)).unwrap();
        log.finish().unwrap();

        let records = read_tick_log(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].active, "South");
        assert_eq!(records[0].kind, "EMERGENCY");
        assert_eq!(records[0].south.as_deref(), Some("GREEN EMERGENCY GREEN 10"));
        assert_eq!(records[0].west.as_deref(), Some("RED NEXT 10"));
        assert_eq!(records[0].north.as_deref(), Some("RED STOP"));
        assert_eq!(records[2].remaining_seconds, 8);
    }

    #[test]
    fn non_tick_events_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticks.csv");
        let mut log = CsvTickLog::new(&path);
        log.handle(&SchedulerEvent::CycleStarted {
            cycle: 1,
            suppressed: vec![],
        })
        .unwrap();
        log.finish().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn approaches_outside_the_rotation_are_blank() {
        let order = [Approach::North, Approach::South];
        let phase = Phase::normal(&order, 0, 5);
        let record = TickRecord::from_tick(&phase.tick_event(1), 0);
        assert_eq!(record.east, None);
        assert_eq!(record.south.as_deref(), Some("YELLOW NEXT 5"));
    }
}
