use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cabinet_core::board::Board;

/// Totals over a headless run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub cpu_cycles: Vec<u64>,
    pub timers_fired: usize,
    pub tiles_redrawn: usize,
    pub watchdog_resets: u32,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frame(s) in {:.2?}: cpu cycles {:?}, {} timer(s), {} tile redraw(s), {} watchdog reset(s)",
            self.frames,
            self.elapsed,
            self.cpu_cycles,
            self.timers_fired,
            self.tiles_redrawn,
            self.watchdog_resets
        )
    }
}

/// Step `frames` frames, stopping at the first fault.
pub fn run(board: &mut Board, frames: u64) -> Result<RunSummary> {
    let start = Instant::now();
    let mut summary = RunSummary {
        cpu_cycles: vec![0; board.cpu_count()],
        ..RunSummary::default()
    };
    for _ in 0..frames {
        let report = board
            .step_frame()
            .with_context(|| format!("frame {}", board.frame()))?;
        log::trace!("{report:?}");
        for (total, cycles) in summary.cpu_cycles.iter_mut().zip(&report.cpu_cycles) {
            *total += cycles;
        }
        summary.timers_fired += report.timers_fired;
        summary.tiles_redrawn += report.composite.tiles_redrawn;
        summary.watchdog_resets += report.watchdog_reset as u32;
        summary.frames += 1;
    }
    summary.elapsed = start.elapsed();
    Ok(summary)
}
