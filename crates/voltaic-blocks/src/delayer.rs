//! Fixed-delay repeater.
//!
//! A delayer listens on the side it faces and drives the opposite side.
//! Whenever the input level (powered or not) changes, it schedules an event
//! to itself `delay` ticks ahead carrying the new level, and sets its own
//! signal when that event comes back. Every change is queued separately, so
//! a pulse shorter than the delay still comes out the other side intact.

use crate::{signal_toward, MAX_SIGNAL};
use voltaic_core::block::{BlockBehavior, Emission, Proposal, UpdateContext, UpdateError};
use voltaic_core::state::StateSchema;

/// Local channel the delayer schedules its own level changes on.
pub const PULSE_CHANNEL: &str = "pulse";

/// Longest accepted delay, in ticks.
pub const MAX_DELAY: i64 = 1 << 16;

#[derive(Debug)]
pub struct Delayer {
    schema: StateSchema,
}

impl Delayer {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new()
                .facing("facing", true, None)
                .int("delay", 1, MAX_DELAY, None)
                .bool("input", Some(false))
                .int("signal", 0, MAX_SIGNAL, Some(0)),
        }
    }
}

impl Default for Delayer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBehavior for Delayer {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let state = ctx.state();
        let facing = state
            .get_facing("facing")
            .ok_or_else(|| UpdateError::failed("delayer has no facing"))?;
        let delay = state
            .get_int("delay")
            .ok_or_else(|| UpdateError::failed("delayer has no delay"))?;

        let mut next = state.clone();

        // Output: the latest level that finished its trip.
        if let Some(level) = ctx.channel(PULSE_CHANNEL).filter_map(|d| d.value.as_bool()).last() {
            next.set("signal", if level { MAX_SIGNAL } else { 0 });
        }

        // Input: queue a change of level.
        let powered = ctx
            .neighbor(facing)
            .is_some_and(|n| signal_toward(n, ctx.position()) > 0);
        let changed = state.get_bool("input") != Some(powered);
        if changed {
            next.set("input", powered);
        }

        let proposal = Proposal::new(next);
        if changed {
            let maturity = ctx.after(delay as u64);
            Ok(proposal.emit(Emission::local(PULSE_CHANNEL, maturity, powered)))
        } else {
            Ok(proposal)
        }
    }
}
