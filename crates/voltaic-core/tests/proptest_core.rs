//! Property-based tests for the Voltaic core engine.
//!
//! Uses proptest to generate random block layouts and event schedules,
//! then verify the engine's structural invariants hold.

use proptest::prelude::*;
use voltaic_core::coord::{Coord, Facing};
use voltaic_core::delay::{DelayQueue, ScheduledEvent};
use voltaic_core::engine::Engine;
use voltaic_core::id::BlockTypeId;
use voltaic_core::report::NullReporter;
use voltaic_core::sim::RunOptions;
use voltaic_core::state::BlockState;
use voltaic_core::test_utils::*;

// ===========================================================================
// Generators
// ===========================================================================

type Placement = (BlockTypeId, BlockState, Coord);

fn arb_coord() -> impl Strategy<Value = Coord> {
    (-4..=4i32, -2..=2i32, -4..=4i32).prop_map(|(x, y, z)| Coord::new(x, y, z))
}

fn arb_facing() -> impl Strategy<Value = Facing> {
    prop::sample::select(Facing::DIRECTIONS.to_vec())
}

/// One random block at a given position. Emitters target whatever they
/// face; relays copy whatever they face. Every emitter sends the same value,
/// so a sink hit by two emitters on one tick ends up the same whichever
/// delivery comes last.
fn arb_block(position: Coord) -> impl Strategy<Value = Placement> {
    prop_oneof![
        Just((sink_type(), BlockState::new(), position)),
        Just((counter_type(), BlockState::new(), position)),
        arb_facing().prop_map(move |f| {
            (relay_type(), BlockState::new().with("facing", f), position)
        }),
        (arb_facing(), 1..6i64).prop_map(move |(f, d)| {
            (
                emitter_type(),
                BlockState::new()
                    .with("facing", f)
                    .with("value", 7)
                    .with("delay", d),
                position,
            )
        }),
    ]
}

/// A layout of up to `max` blocks at distinct positions.
fn arb_layout(max: usize) -> impl Strategy<Value = Vec<Placement>> {
    prop::collection::btree_set(arb_coord(), 1..=max).prop_flat_map(|positions| {
        positions
            .into_iter()
            .map(arb_block)
            .collect::<Vec<_>>()
    })
}

fn build(layout: &[Placement]) -> Engine {
    let mut engine = test_engine();
    engine.add_blocks(layout.iter().cloned()).unwrap();
    engine
}

fn final_states(engine: &Engine) -> Vec<(Coord, BlockState)> {
    let mut states: Vec<(Coord, BlockState)> = engine
        .index()
        .iter()
        .map(|(_, b)| (b.position(), b.state().clone()))
        .collect();
    states.sort_by_key(|(c, _)| *c);
    states
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Determinism: two engines built from the same layout report the same
    /// sequence and end on the same hash.
    #[test]
    fn deterministic_simulation(layout in arb_layout(24), ticks in 0..15u64) {
        let mut a = build(&layout);
        let mut b = build(&layout);
        let ra = a.run_collect(ticks, RunOptions::fast()).unwrap();
        let rb = b.run_collect(ticks, RunOptions::fast()).unwrap();
        prop_assert_eq!(ra, rb);
        prop_assert_eq!(a.state_hash(), b.state_hash());
    }

    /// Ordering independence: permuting insertion order leaves every
    /// block's post-run state unchanged.
    #[test]
    fn insertion_order_independent(
        (layout, shuffled) in arb_layout(24).prop_flat_map(|l| {
            let s = Just(l.clone()).prop_shuffle();
            (Just(l), s)
        }),
        ticks in 1..10u64,
    ) {
        let mut a = build(&layout);
        let mut b = build(&shuffled);
        a.run(ticks, RunOptions::fast(), &mut NullReporter).unwrap();
        b.run(ticks, RunOptions::fast(), &mut NullReporter).unwrap();
        prop_assert_eq!(final_states(&a), final_states(&b));
    }

    /// Zero ticks never changes state or reports anything.
    #[test]
    fn zero_ticks_idempotent(layout in arb_layout(16)) {
        let mut engine = build(&layout);
        let hash = engine.state_hash();
        let reports = engine.run_collect(0, RunOptions::default()).unwrap();
        prop_assert!(reports.is_empty());
        prop_assert_eq!(engine.state_hash(), hash);
    }

    /// Serialize round-trip: the restored engine evolves exactly like the
    /// original.
    #[test]
    fn serialize_round_trip(layout in arb_layout(16), before in 0..6u64, after in 1..6u64) {
        let mut engine = build(&layout);
        engine.run(before, RunOptions::fast(), &mut NullReporter).unwrap();

        let data = engine.serialize().expect("serialize should succeed");
        let mut restored = Engine::deserialize(&data, test_registry())
            .expect("deserialize should succeed");
        prop_assert_eq!(restored.state_hash(), engine.state_hash());

        let ra = engine.run_collect(after, RunOptions::fast()).unwrap();
        let rb = restored.run_collect(after, RunOptions::fast()).unwrap();
        prop_assert_eq!(ra, rb);
    }

    /// The delay queue drains each tick's events in scheduling order and
    /// never hands out an event early.
    #[test]
    fn delay_queue_fifo(maturities in prop::collection::vec(1..20u64, 1..60)) {
        let mut queue = DelayQueue::new();
        for (i, &m) in maturities.iter().enumerate() {
            queue.schedule(ScheduledEvent::new(Coord::ORIGIN, m, i as i64), 0).unwrap();
        }

        let mut seen = 0;
        for tick in 0..20u64 {
            let drained = queue.drain(tick);
            prop_assert!(drained.iter().all(|e| e.maturity_tick == tick));
            let order: Vec<i64> = drained.iter().filter_map(|e| e.value.as_int()).collect();
            let expected: Vec<i64> = maturities
                .iter()
                .enumerate()
                .filter(|&(_, &m)| m == tick)
                .map(|(i, _)| i as i64)
                .collect();
            prop_assert_eq!(order, expected);
            seen += drained.len();
        }
        prop_assert_eq!(seen, maturities.len());
        prop_assert!(queue.is_empty());
    }
}
