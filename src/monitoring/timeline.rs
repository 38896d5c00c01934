use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::communication::messages::SchedulerEvent;
use crate::models::{Approach, PhaseKind};
use crate::monitoring::display::DisplayAdapter;
use crate::monitoring::error::{render_unavailable, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSegment {
    pub approach: Approach,
    pub kind: PhaseKind,
    /// Tick count at which the phase started.
    pub start: u64,
    pub end: u64,
}

/// Collects phases as they run and renders a per-approach timeline PNG when the run ends.
pub struct PhaseTimeline {
    path: PathBuf,
    segments: Vec<PhaseSegment>,
    clock: u64,
}

impl PhaseTimeline {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            segments: Vec::new(),
            clock: 0,
        }
    }

    pub fn segments(&self) -> &[PhaseSegment] {
        &self.segments
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.clock
    }

    fn render(&self) -> Result<(), RenderError> {
        let root = BitMapBackend::new(&self.path, (1000, 320)).into_drawing_area();
        root.fill(&WHITE).map_err(render_unavailable)?;

        let rows = Approach::ALL.len() as f64;
        let end = self.clock.max(1) as f64;
        let mut chart = ChartBuilder::on(&root)
            .caption("Signal Phase Timeline", ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..end, 0.0..rows)
            .map_err(render_unavailable)?;

        chart
            .configure_mesh()
            .x_desc("seconds")
            .y_labels(Approach::ALL.len())
            .y_label_formatter(&|y: &f64| row_label(*y))
            .draw()
            .map_err(render_unavailable)?;

        chart
            .draw_series(self.segments.iter().map(|segment| {
                let row = row_of(segment.approach) as f64;
                let style = match segment.kind {
                    PhaseKind::Normal => GREEN.filled(),
                    PhaseKind::Emergency => RED.filled(),
                };
                Rectangle::new(
                    [
                        (segment.start as f64, row + 0.1),
                        (segment.end as f64, row + 0.9),
                    ],
                    style,
                )
            }))
            .map_err(render_unavailable)?;

        root.present().map_err(render_unavailable)?;
        log::info!("Phase timeline saved to {}", self.path.display());
        Ok(())
    }
}

fn row_of(approach: Approach) -> usize {
    Approach::ALL
        .iter()
        .position(|&a| a == approach)
        .unwrap_or(0)
}

fn row_label(y: f64) -> String {
    Approach::ALL
        .get(y.floor() as usize)
        .map(|a| a.to_string())
        .unwrap_or_default()
}

impl DisplayAdapter for PhaseTimeline {
    fn name(&self) -> &'static str {
        "phase timeline"
    }

    fn handle(&mut self, event: &SchedulerEvent) -> Result<(), RenderError> {
        match event {
            SchedulerEvent::PhaseStarted(phase) => self.segments.push(PhaseSegment {
                approach: phase.active,
                kind: phase.kind,
                start: self.clock,
                end: self.clock,
            }),
            SchedulerEvent::Tick(_) => {
                self.clock += 1;
                if let Some(segment) = self.segments.last_mut() {
                    segment.end = self.clock;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if self.segments.is_empty() {
            log::info!("No phases ran; skipping timeline");
            return Ok(());
        }
        self.render()
    }
}
