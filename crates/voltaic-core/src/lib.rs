//! Voltaic Core -- a deterministic, discrete-time engine for block-based
//! signal circuits.
//!
//! Blocks sit on an integer 3D grid, one per coordinate. Each tick every
//! block reads a frozen view of its neighbors plus whatever delayed events
//! matured for it, and proposes its next state. All proposals are applied
//! together, so the outcome of a tick never depends on the order in which
//! blocks were visited.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Snapshot** -- Drain events maturing on this tick into per-block inboxes.
//! 2. **Compute** -- Every block's behavior returns a [`block::Proposal`].
//! 3. **Apply** -- Replace states and queue new events.
//! 4. **Bookkeeping** -- Advance the clock and compute the state hash.
//!
//! [`engine::Engine::run`] repeats this, optionally paced to the configured
//! ticks per second and reporting each tick to a [`report::Reporter`].
//!
//! # Registering block types
//!
//! ```rust,ignore
//! let mut engine = Engine::new(SimConfig::default());
//! engine.install(&MyBlocks)?;
//! engine.add_block(&BlockTypeId::new("mine", "lamp"), BlockState::new(), Coord::ORIGIN)?;
//! engine.run(20, RunOptions::default(), &mut LogReporter)?;
//! ```
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns the world and runs the tick loop.
//! - [`registry::BlockRegistry`] -- Block types, frozen on the first run.
//! - [`block::BlockBehavior`] -- The contract every block type implements.
//! - [`spatial::SpatialIndex`] -- Position-unique block storage with stable
//!   iteration order.
//! - [`delay::DelayQueue`] -- Events waiting for a future tick.
//! - [`state::StateSchema`] -- Typed property declarations validated on
//!   construction and on every update.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod block;
pub mod coord;
pub mod delay;
pub mod engine;
pub mod id;
pub mod registry;
pub mod report;
pub mod serialize;
pub mod sim;
pub mod spatial;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
