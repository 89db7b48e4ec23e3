//! The simulation engine: owns the block world and runs the tick loop.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`BlockRegistry`] (sealed on the first run)
//! - A [`SpatialIndex`] holding every [`BlockInstance`]
//! - A [`DelayQueue`] of events maturing on future ticks
//! - A [`SimState`] (the clock) and the [`SimConfig`] it was built with
//!
//! # Tick pipeline
//!
//! Each `step()` runs:
//! 1. **Snapshot** -- drain events maturing on the current tick into
//!    per-position inboxes; the index is borrowed immutably from here on
//! 2. **Compute** -- every block, in index order, turns the pre-tick view
//!    and its inbox into a [`Proposal`]; states and emissions are validated
//! 3. **Apply** -- replace states, queue emissions in compute order
//! 4. **Bookkeeping** -- advance the clock, compute the state hash
//!
//! A tick that fails in compute leaves the engine exactly as it was: the
//! drained events go back into the queue and the clock does not move.

use crate::block::{BlockBehavior, BlockInstance, Delivery, Target, UpdateContext, UpdateError};
use crate::coord::Coord;
use crate::delay::{DelayQueue, ScheduleError, ScheduledEvent};
use crate::id::{BlockId, BlockTypeId};
use crate::registry::{BlockRegistry, Plugin, RegistryError};
use crate::report::{BlockReport, Reporter, TickReport};
use crate::sim::{RunOptions, SimConfig, SimState, StateHash, Ticks};
use crate::spatial::{SpatialError, SpatialIndex};
use crate::state::{BlockState, Value};
use std::collections::BTreeMap;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by engine operations. A failed tick is never partially
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The delay queue cannot number any more events.
    #[error(transparent)]
    Queue(#[from] ScheduleError),
    #[error("{block_type} at {position} scheduled an invalid event: {source}")]
    Schedule {
        block_type: BlockTypeId,
        position: Coord,
        #[source]
        source: ScheduleError,
    },
    #[error("update of {block_type} at {position} failed: {source}")]
    Update {
        block_type: BlockTypeId,
        position: Coord,
        #[source]
        source: UpdateError,
    },
}

/// One block's computed but not yet applied result.
struct PendingUpdate {
    id: BlockId,
    state: BlockState,
    events: Vec<ScheduledEvent>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    pub(crate) registry: BlockRegistry,
    pub(crate) config: SimConfig,
    pub(crate) index: SpatialIndex,
    pub(crate) queue: DelayQueue,
    /// Simulation state (the clock).
    pub sim_state: SimState,
    /// Hash computed at the end of the last tick.
    pub(crate) last_state_hash: u64,
    /// Set by mutations between ticks; the hash is then recomputed on demand.
    pub(crate) hash_dirty: bool,
}

impl Engine {
    /// Create an engine with an empty, unsealed registry.
    pub fn new(config: SimConfig) -> Self {
        Self::with_registry(BlockRegistry::new(), config)
    }

    /// Create an engine around an already populated registry. The registry
    /// may be shared with other engines through `clone()`.
    pub fn with_registry(registry: BlockRegistry, config: SimConfig) -> Self {
        Self {
            registry,
            config,
            index: SpatialIndex::new(),
            queue: DelayQueue::new(),
            sim_state: SimState::new(),
            last_state_hash: 0,
            hash_dirty: true,
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register(
        &mut self,
        id: BlockTypeId,
        behavior: impl BlockBehavior + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.register(id, behavior)
    }

    pub fn install(&mut self, plugin: &dyn Plugin) -> Result<(), RegistryError> {
        self.registry.install(plugin)
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Block management
    // -----------------------------------------------------------------------

    /// Construct a block through the registry and place it.
    pub fn add_block(
        &mut self,
        block_type: &BlockTypeId,
        state: BlockState,
        position: Coord,
    ) -> Result<BlockId, EngineError> {
        let block = self.registry.construct(block_type, state, position)?;
        let id = self.index.insert(block)?;
        log::debug!("placed {block_type} at {position}");
        self.hash_dirty = true;
        Ok(id)
    }

    /// Add blocks in order. Stops at the first failure; blocks placed
    /// before it stay placed.
    pub fn add_blocks<I>(&mut self, blocks: I) -> Result<Vec<BlockId>, EngineError>
    where
        I: IntoIterator<Item = (BlockTypeId, BlockState, Coord)>,
    {
        let mut ids = Vec::new();
        for (block_type, state, position) in blocks {
            ids.push(self.add_block(&block_type, state, position)?);
        }
        Ok(ids)
    }

    /// Remove the block at `position`. Events still pending for that
    /// position are kept and delivered to whatever occupies it later.
    pub fn remove_block(&mut self, position: Coord) -> Option<BlockInstance> {
        let removed = self.index.remove(position)?;
        log::debug!("removed {} at {position}", removed.block_type());
        self.hash_dirty = true;
        Some(removed)
    }

    pub fn block(&self, position: Coord) -> Option<&BlockInstance> {
        self.index.get(position)
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    // -----------------------------------------------------------------------
    // External stimuli
    // -----------------------------------------------------------------------

    /// Queue an event from outside the simulation. It must mature on or
    /// after the next tick to be computed.
    pub fn schedule(&mut self, event: ScheduledEvent) -> Result<u64, ScheduleError> {
        // The clock names the tick about to run, so the check is against the
        // last completed tick.
        let completed = self.sim_state.tick.checked_sub(1);
        let sequence = match completed {
            Some(last) => self.queue.schedule(event, last)?,
            None => self.queue.enqueue(event)?,
        };
        self.hash_dirty = true;
        Ok(sequence)
    }

    pub fn delay_queue(&self) -> &DelayQueue {
        &self.queue
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The tick the next step will compute.
    pub fn clock(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Deterministic hash of the clock, every block and every pending event.
    ///
    /// Cached at the end of each tick. After a placement, removal or
    /// external schedule it is recomputed on each call until the next tick.
    pub fn state_hash(&self) -> u64 {
        if self.hash_dirty {
            self.compute_state_hash()
        } else {
            self.last_state_hash
        }
    }

    /// Every block's current state, labelled with `tick`.
    pub fn report(&self, tick: Ticks) -> TickReport {
        TickReport {
            tick,
            blocks: self
                .index
                .iter()
                .map(|(_, b)| BlockReport {
                    position: b.position(),
                    block_type: b.block_type().clone(),
                    state: b.state().clone(),
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Run `ticks` ticks. Seals the registry even when `ticks` is zero.
    ///
    /// With `options.report`, `reporter` receives one report per completed
    /// tick. Unless `options.ignore_speed` is set, each tick is padded to
    /// the configured rate. Returns the first error; earlier ticks stay
    /// applied and the failing one is rolled back.
    pub fn run(
        &mut self,
        ticks: Ticks,
        options: RunOptions,
        reporter: &mut dyn Reporter,
    ) -> Result<(), EngineError> {
        self.registry.seal();
        let budget = self.config.tick_duration();

        for _ in 0..ticks {
            let started = Instant::now();
            let tick = self.sim_state.tick;
            self.step()?;

            if options.report {
                reporter.report(&self.report(tick));
            }
            if !options.ignore_speed {
                if let Some(rest) = budget.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        Ok(())
    }

    /// [`run`](Self::run) with reporting forced on, returning the reports.
    pub fn run_collect(
        &mut self,
        ticks: Ticks,
        options: RunOptions,
    ) -> Result<Vec<TickReport>, EngineError> {
        let mut reports = Vec::new();
        self.run(ticks, options.report(true), &mut reports)?;
        Ok(reports)
    }

    /// Compute one tick, unpaced and unreported. Seals the registry.
    pub fn step(&mut self) -> Result<(), EngineError> {
        self.registry.seal();
        let tick = self.sim_state.tick;

        // Phase 1: snapshot.
        let drained = self.queue.drain(tick);
        let inboxes = self.collect_inboxes(&drained);

        // Phase 2: compute.
        let pending = match self.compute(tick, &inboxes) {
            Ok(pending) => pending,
            Err(e) => {
                self.queue.restore(drained);
                return Err(e);
            }
        };

        let emitted = pending.iter().map(|u| u.events.len()).sum();
        if let Err(e) = self.queue.reserve(emitted) {
            self.queue.restore(drained);
            return Err(e.into());
        }

        // Phase 3: apply.
        let mut queued = 0;
        for update in pending {
            if let Some(block) = self.index.by_id_mut(update.id) {
                block.state = update.state;
            }
            for event in update.events {
                // Cannot fail: room was reserved above.
                self.queue.enqueue(event)?;
                queued += 1;
            }
        }

        // Phase 4: bookkeeping.
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
        self.hash_dirty = false;
        log::trace!(
            "tick {tick}: {} delivered, {queued} queued, hash {:016x}",
            drained.len(),
            self.last_state_hash
        );
        Ok(())
    }

    /// Group matured events by target position, keeping sequence order.
    /// Events whose target is empty are dropped.
    fn collect_inboxes(&self, events: &[ScheduledEvent]) -> BTreeMap<Coord, Vec<Delivery>> {
        let mut inboxes: BTreeMap<Coord, Vec<Delivery>> = BTreeMap::new();
        for event in events {
            if !self.index.contains(event.target) {
                log::warn!(
                    "dropping event from {} for empty position {} at tick {}",
                    event.source,
                    event.target,
                    event.maturity_tick
                );
                continue;
            }
            inboxes.entry(event.target).or_default().push(Delivery {
                source: event.source,
                channel: event.channel.clone(),
                value: event.value.clone(),
                sequence: event.sequence,
            });
        }
        inboxes
    }

    fn compute(
        &self,
        tick: Ticks,
        inboxes: &BTreeMap<Coord, Vec<Delivery>>,
    ) -> Result<Vec<PendingUpdate>, EngineError> {
        let mut pending = Vec::with_capacity(self.index.len());

        for (id, block) in self.index.iter() {
            let position = block.position();
            let failed = |source: UpdateError| EngineError::Update {
                block_type: block.block_type().clone(),
                position,
                source,
            };

            let ctx = UpdateContext {
                tick,
                id,
                block,
                index: &self.index,
                inbox: inboxes.get(&position).map(Vec::as_slice).unwrap_or(&[]),
            };
            let proposal = block.behavior.update(&ctx).map_err(failed)?;
            let state = block
                .behavior
                .schema()
                .validate(proposal.state)
                .map_err(|e| failed(UpdateError::InvalidState(e)))?;

            let mut events = Vec::with_capacity(proposal.emissions.len());
            for emission in proposal.emissions {
                DelayQueue::check(emission.maturity_tick, tick).map_err(|source| {
                    EngineError::Schedule {
                        block_type: block.block_type().clone(),
                        position,
                        source,
                    }
                })?;
                let event = match emission.target {
                    Target::Position(target) => {
                        ScheduledEvent::new(target, emission.maturity_tick, emission.value)
                    }
                    Target::Local(channel) => {
                        ScheduledEvent::new(position, emission.maturity_tick, emission.value)
                            .with_channel(&channel)
                    }
                };
                events.push(event.with_source(position));
            }

            pending.push(PendingUpdate { id, state, events });
        }
        Ok(pending)
    }

    pub(crate) fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);

        hasher.write_u64(self.index.len() as u64);
        for (_, block) in self.index.iter() {
            hasher.write_str(&block.block_type().namespace);
            hasher.write_str(&block.block_type().name);
            hash_coord(&mut hasher, block.position());
            hasher.write_u64(block.state().len() as u64);
            for (name, value) in block.state().iter() {
                hasher.write_str(name);
                hash_value(&mut hasher, value);
            }
        }

        hasher.write_u64(self.queue.len() as u64);
        hasher.write_u64(self.queue.next_sequence());
        for event in self.queue.iter() {
            hash_coord(&mut hasher, event.target);
            hash_coord(&mut hasher, event.source);
            hasher.write_u64(event.maturity_tick);
            hasher.write_u64(event.sequence);
            match &event.channel {
                Some(channel) => {
                    hasher.write_u8(1);
                    hasher.write_str(channel);
                }
                None => hasher.write_u8(0),
            }
            hash_value(&mut hasher, &event.value);
        }

        hasher.finish()
    }
}

fn hash_coord(hasher: &mut StateHash, c: Coord) {
    hasher.write_i32(c.x);
    hasher.write_i32(c.y);
    hasher.write_i32(c.z);
}

fn hash_value(hasher: &mut StateHash, value: &Value) {
    match value {
        Value::Int(v) => {
            hasher.write_u8(0);
            hasher.write_i64(*v);
        }
        Value::Bool(v) => {
            hasher.write_u8(1);
            hasher.write_u8(*v as u8);
        }
        Value::Enum(s) => {
            hasher.write_u8(2);
            hasher.write_str(s);
        }
        Value::Facing(f) => {
            hasher.write_u8(3);
            hasher.write_str(f.as_str());
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}
