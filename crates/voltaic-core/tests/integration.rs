//! Integration tests for the Voltaic simulation engine.
//!
//! These tests exercise end-to-end behavior across the full engine pipeline:
//! registration, placement, delayed delivery, snapshot semantics, reporting,
//! serialization, and determinism.

use voltaic_core::block::{BlockBehavior, Emission, Proposal, UpdateContext, UpdateError};
use voltaic_core::coord::{Coord, Facing};
use voltaic_core::delay::ScheduledEvent;
use voltaic_core::engine::{Engine, EngineError};
use voltaic_core::id::BlockTypeId;
use voltaic_core::registry::{BlockRegistry, Plugin, RegistryError};
use voltaic_core::report::{FnReporter, NullReporter, TickReport};
use voltaic_core::sim::{RunOptions, SimConfig};
use voltaic_core::spatial::SpatialError;
use voltaic_core::state::{BlockState, StateSchema};
use voltaic_core::test_utils::*;

fn value_at(report: &TickReport, position: Coord) -> Option<i64> {
    report
        .block_at(position)
        .and_then(|b| b.state.get_int("value"))
}

// ===========================================================================
// Test 1: Delay fidelity
// ===========================================================================
//
// Emitter --(7, three ticks)--> Sink
// The sink reads 0 until tick 3 and 7 from then on.

#[test]
fn delay_fidelity() {
    let mut engine = test_engine();
    let sink = Coord::new(1, 0, 0);
    engine
        .add_blocks(vec![
            (emitter_type(), emitter_state(7, 3), Coord::ORIGIN),
            (sink_type(), BlockState::new(), sink),
        ])
        .unwrap();

    let reports = engine.run_collect(5, RunOptions::fast()).unwrap();
    let values: Vec<i64> = reports.iter().filter_map(|r| value_at(r, sink)).collect();
    assert_eq!(values, vec![0, 0, 0, 7, 7]);
}

#[test]
fn sink_holds_value_until_next_event() {
    let mut engine = test_engine();
    let sink = Coord::ORIGIN;
    engine.add_block(&sink_type(), BlockState::new(), sink).unwrap();
    engine.schedule(ScheduledEvent::new(sink, 2, 4)).unwrap();
    engine.schedule(ScheduledEvent::new(sink, 5, 9)).unwrap();

    let reports = engine.run_collect(7, RunOptions::fast()).unwrap();
    let values: Vec<i64> = reports.iter().filter_map(|r| value_at(r, sink)).collect();
    assert_eq!(values, vec![0, 0, 4, 4, 4, 9, 9]);
}

// ===========================================================================
// Test 2: In-flight events are delivered FIFO
// ===========================================================================

#[test]
fn same_tick_events_arrive_in_scheduling_order() {
    let mut engine = test_engine();
    engine
        .add_block(&sink_type(), BlockState::new(), Coord::ORIGIN)
        .unwrap();
    for v in [3, 1, 4, 1, 5] {
        engine.schedule(ScheduledEvent::new(Coord::ORIGIN, 1, v)).unwrap();
    }

    engine.run(2, RunOptions::fast(), &mut NullReporter).unwrap();
    // The sink keeps the last delivery of the tick.
    let sink = engine.block(Coord::ORIGIN).unwrap();
    assert_eq!(sink.state().get_int("value"), Some(5));
    assert!(engine.delay_queue().is_empty());
}

// ===========================================================================
// Test 3: Uniqueness
// ===========================================================================

#[test]
fn second_block_at_same_coordinate_conflicts() {
    let mut engine = test_engine();
    let pos = Coord::new(2, 2, 2);
    engine.add_block(&sink_type(), BlockState::new(), pos).unwrap();
    let err = engine
        .add_block(&counter_type(), BlockState::new(), pos)
        .unwrap_err();

    assert_eq!(err, EngineError::Spatial(SpatialError::Conflict { position: pos }));
    assert_eq!(engine.block_count(), 1);
    assert_eq!(engine.block(pos).unwrap().block_type(), &sink_type());
}

// ===========================================================================
// Test 4: Registry integrity
// ===========================================================================

#[test]
fn registry_rejects_duplicates_and_late_registration() {
    let mut engine = test_engine();
    let dup = engine.register(sink_type(), Sink::new()).unwrap_err();
    assert_eq!(dup, RegistryError::DuplicateType(sink_type()));

    engine.run(1, RunOptions::fast(), &mut NullReporter).unwrap();
    let late = BlockTypeId::new("late", "sink");
    let locked = engine.register(late.clone(), Sink::new()).unwrap_err();
    assert_eq!(locked, RegistryError::Locked(late.clone()));
    assert!(!engine.registry().contains(&late));
}

#[test]
fn blocks_can_still_be_placed_after_sealing() {
    let mut engine = test_engine();
    engine.run(1, RunOptions::fast(), &mut NullReporter).unwrap();
    engine
        .add_block(&counter_type(), BlockState::new(), Coord::ORIGIN)
        .unwrap();
    engine.step().unwrap();
    let counter = engine.block(Coord::ORIGIN).unwrap();
    assert_eq!(counter.state().get_int("value"), Some(1));
}

// ===========================================================================
// Test 5: Zero-tick idempotence
// ===========================================================================

#[test]
fn zero_tick_run_is_idempotent() {
    let mut engine = test_engine();
    add_emitter(&mut engine, Coord::ORIGIN, 1, 1);
    let hash = engine.state_hash();

    let mut calls = 0;
    engine
        .run(0, RunOptions::default(), &mut FnReporter(|_: &TickReport| calls += 1))
        .unwrap();

    assert_eq!(calls, 0);
    assert_eq!(engine.state_hash(), hash);
    assert!(engine.delay_queue().is_empty());
}

// ===========================================================================
// Test 6: Ordering independence
// ===========================================================================
//
// A counter feeding a chain of relays. Under a sequential sweep the relays'
// values would depend on whether the counter was visited first.

fn relay_chain(order: &[usize]) -> Vec<(Coord, i64)> {
    let mut engine = test_engine();
    let placements: Vec<(BlockTypeId, BlockState, Coord)> = vec![
        (counter_type(), BlockState::new(), Coord::new(0, 0, 0)),
        (
            relay_type(),
            BlockState::new().with("facing", Facing::North),
            Coord::new(-1, 0, 0),
        ),
        (
            relay_type(),
            BlockState::new().with("facing", Facing::North),
            Coord::new(-2, 0, 0),
        ),
        (
            relay_type(),
            BlockState::new().with("facing", Facing::North),
            Coord::new(-3, 0, 0),
        ),
    ];
    engine
        .add_blocks(order.iter().map(|&i| placements[i].clone()))
        .unwrap();
    engine.run(6, RunOptions::fast(), &mut NullReporter).unwrap();

    let mut values: Vec<(Coord, i64)> = engine
        .index()
        .iter()
        .map(|(_, b)| (b.position(), b.state().get_int("value").unwrap_or(-1)))
        .collect();
    values.sort();
    values
}

#[test]
fn insertion_order_does_not_change_outcome() {
    let forward = relay_chain(&[0, 1, 2, 3]);
    let backward = relay_chain(&[3, 2, 1, 0]);
    let shuffled = relay_chain(&[2, 0, 3, 1]);
    assert_eq!(forward, backward);
    assert_eq!(forward, shuffled);
    assert_eq!(
        forward,
        vec![
            (Coord::new(-3, 0, 0), 3),
            (Coord::new(-2, 0, 0), 4),
            (Coord::new(-1, 0, 0), 5),
            (Coord::new(0, 0, 0), 6),
        ]
    );
}

// ===========================================================================
// Test 7: Determinism and pacing
// ===========================================================================

fn mixed_circuit(config: SimConfig) -> Engine {
    let mut engine = Engine::with_registry(test_registry(), config);
    add_emitter(&mut engine, Coord::ORIGIN, 5, 2);
    engine
        .add_block(&sink_type(), BlockState::new(), Coord::new(1, 0, 0))
        .unwrap();
    engine
        .add_block(&counter_type(), BlockState::new(), Coord::new(0, 0, 5))
        .unwrap();
    add_relay(&mut engine, Coord::new(0, 0, 4), Facing::West);
    engine
}

#[test]
fn identical_runs_produce_identical_reports() {
    let mut a = mixed_circuit(SimConfig::default());
    let mut b = mixed_circuit(SimConfig::default());
    let ra = a.run_collect(12, RunOptions::fast()).unwrap();
    let rb = b.run_collect(12, RunOptions::fast()).unwrap();
    assert_eq!(ra, rb);
    assert_eq!(a.state_hash(), b.state_hash());
}

#[test]
fn pacing_does_not_change_results() {
    let config = SimConfig {
        ticks_per_second: 500,
    };
    let mut fast = mixed_circuit(config.clone());
    let mut paced = mixed_circuit(config);
    fast.run(5, RunOptions::fast(), &mut NullReporter).unwrap();
    paced
        .run(5, RunOptions::default().report(false), &mut NullReporter)
        .unwrap();
    assert_eq!(fast.state_hash(), paced.state_hash());
}

// ===========================================================================
// Test 8: A plugin-provided block using a local channel
// ===========================================================================
//
// A blinker schedules a "toggle" event to itself every `period` ticks and
// flips `lit` whenever one arrives.

#[derive(Debug)]
struct Blinker {
    schema: StateSchema,
}

impl BlockBehavior for Blinker {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn update(&self, ctx: &UpdateContext<'_>) -> Result<Proposal, UpdateError> {
        let period = ctx.state().get_int("period").unwrap_or(1) as u64;
        let toggles = ctx.channel("toggle").count();
        let started = ctx.state().get_bool("started") == Some(true);

        let mut next = ctx.state().clone();
        if toggles % 2 == 1 {
            let lit = ctx.state().get_bool("lit") == Some(true);
            next.set("lit", !lit);
        }
        let mut proposal = Proposal::new(next.with("started", true));
        if !started || toggles > 0 {
            proposal = proposal.emit(Emission::local("toggle", ctx.after(period), true));
        }
        Ok(proposal)
    }
}

struct BlinkerPlugin;

impl Plugin for BlinkerPlugin {
    fn name(&self) -> &str {
        "blinker"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn register(&self, registry: &mut BlockRegistry) -> Result<(), RegistryError> {
        registry.register(
            BlockTypeId::new("blink", "blinker"),
            Blinker {
                schema: StateSchema::new()
                    .int("period", 1, 100, Some(2))
                    .bool("lit", Some(false))
                    .bool("started", Some(false)),
            },
        )
    }
}

#[test]
fn plugin_block_toggles_on_local_channel() {
    let mut engine = Engine::new(SimConfig::default());
    engine.install(&BlinkerPlugin).unwrap();
    engine
        .add_block(&BlockTypeId::new("blink", "blinker"), BlockState::new(), Coord::ORIGIN)
        .unwrap();

    let reports = engine.run_collect(7, RunOptions::fast()).unwrap();
    let lit: Vec<bool> = reports
        .iter()
        .filter_map(|r| r.block_at(Coord::ORIGIN))
        .filter_map(|b| b.state.get_bool("lit"))
        .collect();
    assert_eq!(lit, vec![false, false, true, true, false, false, true]);

    let pending: Vec<_> = engine.delay_queue().iter().collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].channel.as_deref(), Some("toggle"));
    assert_eq!(pending[0].source, Coord::ORIGIN);
}

// ===========================================================================
// Test 9: Save, load, continue
// ===========================================================================

#[test]
fn save_load_mid_flight() {
    let mut engine = test_engine();
    let sink = Coord::new(1, 0, 0);
    add_emitter(&mut engine, Coord::ORIGIN, 7, 3);
    engine.add_block(&sink_type(), BlockState::new(), sink).unwrap();
    engine.run(2, RunOptions::fast(), &mut NullReporter).unwrap();

    let data = engine.serialize().unwrap();
    let mut restored = Engine::deserialize(&data, test_registry()).unwrap();
    let reports = restored.run_collect(3, RunOptions::fast()).unwrap();
    let values: Vec<i64> = reports.iter().filter_map(|r| value_at(r, sink)).collect();
    assert_eq!(values, vec![0, 7, 7]);
    assert_eq!(reports[0].tick, 2);
}
