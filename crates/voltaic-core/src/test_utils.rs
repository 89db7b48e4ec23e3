//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature). All block types live in the `test` namespace.

use crate::block::{BlockBehavior, BlockInstance, Emission, Proposal, UpdateContext, UpdateError};
use crate::coord::{Coord, Facing};
use crate::engine::Engine;
use crate::id::BlockTypeId;
use crate::registry::{BlockRegistry, Plugin, RegistryError};
use crate::sim::SimConfig;
use crate::state::{BlockState, StateSchema};

pub const NAMESPACE: &str = "test";

/// Upper bound of the overflow block's counter.
pub const OVERFLOW_MAX: i64 = 3;

// ===========================================================================
// Type ids
// ===========================================================================

pub fn emitter_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "emitter")
}
pub fn sink_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "sink")
}
pub fn counter_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "counter")
}
pub fn relay_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "relay")
}
pub fn faulty_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "faulty")
}
pub fn backdated_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "backdated")
}
pub fn overflow_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "overflow")
}

// ===========================================================================
// Block types
// ===========================================================================

/// Emits `value` once, on its first tick, to the block it faces, maturing
/// `delay` ticks later.
#[derive(Debug)]
pub struct Emitter {
    schema: StateSchema,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new()
                .facing("facing", true, None)
                .int("value", i64::MIN, i64::MAX, None)
                .int("delay", 1, 1_000_000, None)
                .bool("fired", Some(false)),
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBehavior for Emitter {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let state = ctx.state();
        if state.get_bool("fired") == Some(true) {
            return Ok(Proposal::unchanged(ctx));
        }
        let facing = state
            .get_facing("facing")
            .ok_or_else(|| UpdateError::failed("emitter without facing"))?;
        let target = ctx
            .position()
            .offset(facing)
            .ok_or_else(|| UpdateError::failed("emitter facing omni"))?;
        let value = state.get_int("value").unwrap_or(0);
        let delay = state.get_int("delay").unwrap_or(1) as u64;

        let mut next = state.clone();
        next.set("fired", true);
        Ok(Proposal::new(next).emit(Emission::to(target, ctx.after(delay), value)))
    }
}

/// Copies the value of the last integer delivered to it.
#[derive(Debug)]
pub struct Sink {
    schema: StateSchema,
}

impl Sink {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new().int("value", i64::MIN, i64::MAX, Some(0)),
        }
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBehavior for Sink {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        match ctx.inbox().iter().rev().find_map(|d| d.value.as_int()) {
            Some(v) => Ok(Proposal::new(ctx.state().clone().with("value", v))),
            None => Ok(Proposal::unchanged(ctx)),
        }
    }
}

/// Adds one to `value` every tick.
#[derive(Debug)]
pub struct Counter {
    schema: StateSchema,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new().int("value", 0, i64::MAX, Some(0)),
        }
    }
}

impl BlockBehavior for Counter {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let value = ctx.state().get_int("value").unwrap_or(0);
        Ok(Proposal::new(ctx.state().clone().with("value", value + 1)))
    }
}

/// Copies `value` from the block it faces.
#[derive(Debug)]
pub struct Relay {
    schema: StateSchema,
}

impl Relay {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new()
                .facing("facing", true, None)
                .int("value", i64::MIN, i64::MAX, Some(0)),
        }
    }
}

impl BlockBehavior for Relay {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let upstream = ctx
            .state()
            .get_facing("facing")
            .and_then(|f| ctx.neighbor(f))
            .and_then(|b| b.state().get_int("value"))
            .unwrap_or(0);
        Ok(Proposal::new(ctx.state().clone().with("value", upstream)))
    }
}

/// Fails its update on tick `fail_at`.
#[derive(Debug)]
pub struct Faulty {
    schema: StateSchema,
}

impl Faulty {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new().int("fail_at", 0, i64::MAX, Some(0)),
        }
    }
}

impl BlockBehavior for Faulty {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        if ctx.state().get_int("fail_at") == Some(ctx.tick() as i64) {
            return Err(UpdateError::failed(format!("faulty block tripped at tick {}", ctx.tick())));
        }
        Ok(Proposal::unchanged(ctx))
    }
}

/// Schedules an event for the tick being computed, which is never allowed.
#[derive(Debug)]
pub struct Backdated {
    schema: StateSchema,
}

impl Backdated {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new(),
        }
    }
}

impl BlockBehavior for Backdated {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let target = ctx.position() + Coord::new(3, 0, 0);
        Ok(Proposal::unchanged(ctx).emit(Emission::to(target, ctx.tick(), 1)))
    }
}

/// Counts up past its schema's maximum of [`OVERFLOW_MAX`].
#[derive(Debug)]
pub struct Overflow {
    schema: StateSchema,
}

impl Overflow {
    pub fn new() -> Self {
        Self {
            schema: StateSchema::new().int("value", 0, OVERFLOW_MAX, Some(0)),
        }
    }
}

impl BlockBehavior for Overflow {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let value = ctx.state().get_int("value").unwrap_or(0);
        Ok(Proposal::new(ctx.state().clone().with("value", value + 1)))
    }
}

/// Registers every test block type, emitter first.
pub struct TestBlocks;

impl Plugin for TestBlocks {
    fn name(&self) -> &str {
        "test-blocks"
    }

    fn register(&self, registry: &mut BlockRegistry) -> Result<(), RegistryError> {
        registry.register(emitter_type(), Emitter::new())?;
        registry.register(sink_type(), Sink::new())?;
        registry.register(counter_type(), Counter::new())?;
        registry.register(relay_type(), Relay::new())?;
        registry.register(faulty_type(), Faulty::new())?;
        registry.register(backdated_type(), Backdated::new())?;
        registry.register(overflow_type(), Overflow::new())?;
        Ok(())
    }
}

// ===========================================================================
// Engine and block helpers
// ===========================================================================

pub fn test_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    registry.install(&TestBlocks).unwrap();
    registry
}

/// An engine with the test blocks registered and the default config.
pub fn test_engine() -> Engine {
    Engine::with_registry(test_registry(), SimConfig::default())
}

pub fn sink_at(position: Coord) -> BlockInstance {
    test_registry()
        .construct(&sink_type(), BlockState::new(), position)
        .unwrap()
}

pub fn counter_at(position: Coord) -> BlockInstance {
    test_registry()
        .construct(&counter_type(), BlockState::new(), position)
        .unwrap()
}

pub fn emitter_state(value: i64, delay: i64) -> BlockState {
    BlockState::new()
        .with("facing", Facing::North)
        .with("value", value)
        .with("delay", delay)
}

/// Place a north-facing emitter at `position`.
pub fn add_emitter(engine: &mut Engine, position: Coord, value: i64, delay: i64) {
    engine
        .add_block(&emitter_type(), emitter_state(value, delay), position)
        .unwrap();
}

/// Place a relay at `position` reading from the block it faces.
pub fn add_relay(engine: &mut Engine, position: Coord, facing: Facing) {
    engine
        .add_block(&relay_type(), BlockState::new().with("facing", facing), position)
        .unwrap();
}
