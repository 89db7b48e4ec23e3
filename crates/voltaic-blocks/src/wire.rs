//! Signal-carrying wire.
//!
//! Each tick a wire takes the strongest signal offered to it by the blocks
//! on the sides it listens to (its `facing`, or all six sides for omni),
//! minus one. Signals therefore fade by one per wire and travel one wire
//! per tick.

use crate::{signal_toward, MAX_SIGNAL};
use voltaic_core::block::{BlockBehavior, Proposal, UpdateContext, UpdateError};
use voltaic_core::coord::Facing;
use voltaic_core::state::StateSchema;

#[derive(Debug)]
pub struct Wire {
    schema: StateSchema,
}

impl Wire {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new()
                .facing("facing", false, Some(Facing::Omni))
                .int("signal", 0, MAX_SIGNAL, Some(0)),
        }
    }
}

impl Default for Wire {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBehavior for Wire {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let facing = ctx.state().get_facing("facing").unwrap_or(Facing::Omni);
        let strongest = ctx
            .neighbors(facing)
            .map(|n| signal_toward(n, ctx.position()))
            .max()
            .unwrap_or(0);
        let signal = (strongest - 1).max(0);
        Ok(Proposal::new(ctx.state().clone().with("signal", signal)))
    }
}
