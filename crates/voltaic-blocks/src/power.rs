//! Constant full-strength source.

use crate::MAX_SIGNAL;
use voltaic_core::block::{BlockBehavior, Proposal, UpdateContext, UpdateError};
use voltaic_core::coord::Coord;
use voltaic_core::state::{BlockState, StateError, StateSchema};

#[derive(Debug)]
pub struct Power {
    schema: StateSchema,
}

impl Power {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new().int("signal", 0, MAX_SIGNAL, Some(MAX_SIGNAL)),
        }
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBehavior for Power {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Whatever signal was supplied, a power block always starts at full.
    fn construct(&self, state: BlockState, _position: Coord) -> Result<BlockState, StateError> {
        Ok(self.schema.validate(state)?.with("signal", MAX_SIGNAL))
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        Ok(Proposal::unchanged(ctx))
    }
}
