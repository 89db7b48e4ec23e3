//! Block instances and the behavior contract every block type implements.
//!
//! Behaviors never see the engine. Each tick, [`BlockBehavior::update`]
//! receives an [`UpdateContext`] (a read-only view of the pre-tick world
//! plus the events that matured for this block) and returns a [`Proposal`]
//! (new state plus events to schedule). The engine applies all proposals
//! together once every block has been updated.

use crate::coord::{Coord, Facing};
use crate::id::{BlockId, BlockTypeId};
use crate::sim::Ticks;
use crate::spatial::SpatialIndex;
use crate::state::{BlockState, StateError, StateSchema, Value};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// BlockBehavior trait
// ---------------------------------------------------------------------------

/// Construction and update rules for one block type.
///
/// Behaviors are shared between every instance of their type (and between
/// engines built from the same registry), so they hold no per-instance data.
/// All per-instance data lives in the [`BlockState`].
pub trait BlockBehavior: fmt::Debug + Send + Sync {
    /// The properties this type accepts.
    fn schema(&self) -> &StateSchema;

    /// Build the initial state of a new instance. The default validates
    /// `state` against [`schema`](Self::schema).
    fn construct(&self, state: BlockState, position: Coord) -> Result<BlockState, StateError> {
        let _ = position;
        self.schema().validate(state)
    }

    /// Compute this block's next state from the pre-tick view.
    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError>;
}

// ---------------------------------------------------------------------------
// BlockInstance
// ---------------------------------------------------------------------------

/// A placed block: its type, position and current state.
#[derive(Debug, Clone)]
pub struct BlockInstance {
    block_type: BlockTypeId,
    position: Coord,
    pub(crate) state: BlockState,
    pub(crate) behavior: Arc<dyn BlockBehavior>,
}

impl BlockInstance {
    pub(crate) fn new(
        block_type: BlockTypeId,
        position: Coord,
        state: BlockState,
        behavior: Arc<dyn BlockBehavior>,
    ) -> Self {
        Self {
            block_type,
            position,
            state,
            behavior,
        }
    }

    pub fn block_type(&self) -> &BlockTypeId {
        &self.block_type
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    pub fn behavior(&self) -> &dyn BlockBehavior {
        self.behavior.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Deliveries and emissions
// ---------------------------------------------------------------------------

/// A matured event handed to its target block during the compute phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Position of the block that scheduled the event.
    pub source: Coord,
    /// Block-local channel, for events a block addressed to itself.
    pub channel: Option<String>,
    pub value: Value,
    /// Scheduling order. Deliveries in an inbox are sorted by it.
    pub sequence: u64,
}

/// Where an emitted event should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Whatever block occupies this position when the event matures.
    Position(Coord),
    /// The emitting block itself, on a named channel.
    Local(String),
}

/// An event a block asks the engine to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub target: Target,
    /// Must be strictly after the tick that produced it.
    pub maturity_tick: Ticks,
    pub value: Value,
}

impl Emission {
    pub fn to(position: Coord, maturity_tick: Ticks, value: impl Into<Value>) -> Self {
        Self {
            target: Target::Position(position),
            maturity_tick,
            value: value.into(),
        }
    }

    pub fn local(channel: &str, maturity_tick: Ticks, value: impl Into<Value>) -> Self {
        Self {
            target: Target::Local(channel.to_string()),
            maturity_tick,
            value: value.into(),
        }
    }
}

/// The result of one update: the block's next state and any new events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub state: BlockState,
    pub emissions: Vec<Emission>,
}

impl Proposal {
    pub fn new(state: BlockState) -> Self {
        Self {
            state,
            emissions: Vec::new(),
        }
    }

    /// Keep the current state, schedule nothing.
    pub fn unchanged(ctx: &UpdateContext<'_>) -> Self {
        Self::new(ctx.state().clone())
    }

    pub fn emit(mut self, emission: Emission) -> Self {
        self.emissions.push(emission);
        self
    }
}

// ---------------------------------------------------------------------------
// UpdateContext
// ---------------------------------------------------------------------------

/// Read-only view handed to [`BlockBehavior::update`].
///
/// Every lookup goes through the pre-tick index; other blocks' proposals for
/// this tick are never visible.
pub struct UpdateContext<'a> {
    pub(crate) tick: Ticks,
    pub(crate) id: BlockId,
    pub(crate) block: &'a BlockInstance,
    pub(crate) index: &'a SpatialIndex,
    pub(crate) inbox: &'a [Delivery],
}

impl<'a> UpdateContext<'a> {
    /// The tick being computed.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// `tick + delay`, the maturity tick for an event `delay` ticks out.
    pub fn after(&self, delay: Ticks) -> Ticks {
        self.tick.saturating_add(delay)
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn position(&self) -> Coord {
        self.block.position
    }

    pub fn block_type(&self) -> &BlockTypeId {
        &self.block.block_type
    }

    pub fn state(&self) -> &'a BlockState {
        &self.block.state
    }

    /// Events that matured this tick for this block, in scheduling order.
    pub fn inbox(&self) -> &'a [Delivery] {
        self.inbox
    }

    /// Deliveries on one local channel.
    pub fn channel<'s>(&'s self, channel: &'s str) -> impl Iterator<Item = &'a Delivery> + 's {
        self.inbox
            .iter()
            .filter(move |d| d.channel.as_deref() == Some(channel))
    }

    /// Pre-tick occupant of any position.
    pub fn get(&self, position: Coord) -> Option<&'a BlockInstance> {
        self.index.get(position)
    }

    /// Pre-tick occupant of the adjacent position in a single direction.
    pub fn neighbor(&self, facing: Facing) -> Option<&'a BlockInstance> {
        self.index.neighbor(self.block.position, facing)
    }

    /// Pre-tick occupants of every position `facing` covers.
    pub fn neighbors(&self, facing: Facing) -> impl Iterator<Item = &'a BlockInstance> + use<'a> {
        self.index.neighbors(self.block.position, facing)
    }
}

// ---------------------------------------------------------------------------
// UpdateError
// ---------------------------------------------------------------------------

/// Failure raised by, or on behalf of, a block's update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// The behavior itself refused to produce a proposal.
    #[error("{0}")]
    Failed(String),
    /// The proposed state does not fit the type's schema.
    #[error("proposed state rejected: {0}")]
    InvalidState(#[from] StateError),
}

impl UpdateError {
    pub fn failed(reason: impl Into<String>) -> Self {
        UpdateError::Failed(reason.into())
    }
}
