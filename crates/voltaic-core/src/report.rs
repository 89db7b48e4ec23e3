//! Per-tick state reports.
//!
//! When a run has reporting enabled, the engine builds a [`TickReport`] after
//! each tick's apply phase and hands it to a [`Reporter`]. Reports are owned
//! copies in the spatial index's stable order; reporters cannot reach back
//! into the engine.

use crate::coord::Coord;
use crate::id::BlockTypeId;
use crate::sim::Ticks;
use crate::state::BlockState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One block's entry in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReport {
    pub position: Coord,
    pub block_type: BlockTypeId,
    pub state: BlockState,
}

/// Every block's state after a completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The tick that was computed.
    pub tick: Ticks,
    pub blocks: Vec<BlockReport>,
}

impl TickReport {
    pub fn block_at(&self, position: Coord) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.position == position)
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tick {}", self.tick)?;
        for b in &self.blocks {
            writeln!(f, "  {} {} {}", b.position, b.block_type, b.state)?;
        }
        Ok(())
    }
}

/// Receives reports synchronously during a run.
pub trait Reporter {
    fn report(&mut self, report: &TickReport);
}

/// Collects every report.
impl Reporter for Vec<TickReport> {
    fn report(&mut self, report: &TickReport) {
        self.push(report.clone());
    }
}

/// Discards reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _report: &TickReport) {}
}

/// Writes each report through the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, report: &TickReport) {
        log::info!("{report}");
    }
}

/// Adapts a closure into a [`Reporter`].
pub struct FnReporter<F>(pub F);

impl<F: FnMut(&TickReport)> Reporter for FnReporter<F> {
    fn report(&mut self, report: &TickReport) {
        (self.0)(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TickReport {
        TickReport {
            tick: 3,
            blocks: vec![BlockReport {
                position: Coord::new(1, 0, 0),
                block_type: BlockTypeId::new("test", "sink"),
                state: BlockState::new().with("value", 7),
            }],
        }
    }

    #[test]
    fn vec_reporter_collects() {
        let mut reports: Vec<TickReport> = Vec::new();
        reports.report(&sample());
        reports.report(&sample());
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn fn_reporter_calls_closure() {
        let mut ticks = Vec::new();
        {
            let mut r = FnReporter(|rep: &TickReport| ticks.push(rep.tick));
            r.report(&sample());
        }
        assert_eq!(ticks, vec![3]);
    }

    #[test]
    fn display_lists_blocks() {
        let text = sample().to_string();
        assert!(text.starts_with("tick 3"));
        assert!(text.contains("test:sink"));
        assert!(text.contains("value: 7"));
    }

    #[test]
    fn block_at_finds_entry() {
        let r = sample();
        assert!(r.block_at(Coord::new(1, 0, 0)).is_some());
        assert!(r.block_at(Coord::ORIGIN).is_none());
    }
}
