//! Manual switch.
//!
//! A lever is on or off; when on it outputs full strength on every side.
//! Any boolean event delivered to it sets `on`, so a caller can flip it by
//! scheduling an event at its position. Several deliveries in one tick
//! resolve to the last one.

use crate::MAX_SIGNAL;
use voltaic_core::block::{BlockBehavior, Proposal, UpdateContext, UpdateError};
use voltaic_core::coord::Coord;
use voltaic_core::state::{BlockState, StateError, StateSchema};

#[derive(Debug)]
pub struct Lever {
    schema: StateSchema,
}

impl Lever {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new()
                .bool("on", Some(false))
                .int("signal", 0, MAX_SIGNAL, Some(0)),
        }
    }
}

impl Default for Lever {
    fn default() -> Self {
        Self::new()
    }
}

fn level(on: bool) -> i64 {
    if on { MAX_SIGNAL } else { 0 }
}

impl BlockBehavior for Lever {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn construct(&self, state: BlockState, _position: Coord) -> Result<BlockState, StateError> {
        let state = self.schema.validate(state)?;
        let on = state.get_bool("on").unwrap_or(false);
        Ok(state.with("signal", level(on)))
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let current = ctx.state().get_bool("on").unwrap_or(false);
        let on = ctx
            .inbox()
            .iter()
            .rev()
            .find_map(|d| d.value.as_bool())
            .unwrap_or(current);
        if on != current {
            log::debug!("lever at {} switched {}", ctx.position(), if on { "on" } else { "off" });
        }
        Ok(Proposal::new(
            ctx.state().clone().with("on", on).with("signal", level(on)),
        ))
    }
}
