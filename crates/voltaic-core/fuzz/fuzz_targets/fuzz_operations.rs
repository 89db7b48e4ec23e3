#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use voltaic_core::coord::{Coord, Facing};
use voltaic_core::delay::ScheduledEvent;
use voltaic_core::engine::Engine;
use voltaic_core::state::BlockState;
use voltaic_core::test_utils::*;

/// A structured engine operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddSink { x: i8, z: i8 },
    AddCounter { x: i8, z: i8 },
    AddEmitter { x: i8, z: i8, value: i8, delay: u8 },
    AddRelay { x: i8, z: i8, facing: u8 },
    Remove { x: i8, z: i8 },
    Schedule { x: i8, z: i8, tick: u16, value: i8 },
    Step,
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn at(x: i8, z: i8) -> Coord {
    Coord::new(x as i32, 0, z as i32)
}

fuzz_target!(|input: FuzzInput| {
    let mut engine = test_engine();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::AddSink { x, z } => {
                let _ = engine.add_block(&sink_type(), BlockState::new(), at(x, z));
            }
            FuzzOp::AddCounter { x, z } => {
                let _ = engine.add_block(&counter_type(), BlockState::new(), at(x, z));
            }
            FuzzOp::AddEmitter { x, z, value, delay } => {
                let state = emitter_state(value as i64, delay as i64);
                let _ = engine.add_block(&emitter_type(), state, at(x, z));
            }
            FuzzOp::AddRelay { x, z, facing } => {
                let facing = Facing::DIRECTIONS[facing as usize % Facing::DIRECTIONS.len()];
                let state = BlockState::new().with("facing", facing);
                let _ = engine.add_block(&relay_type(), state, at(x, z));
            }
            FuzzOp::Remove { x, z } => {
                engine.remove_block(at(x, z));
            }
            FuzzOp::Schedule { x, z, tick, value } => {
                let _ = engine.schedule(ScheduledEvent::new(at(x, z), tick as u64, value as i64));
            }
            FuzzOp::Step => {
                // Errors are fine; panics are not.
                let _ = engine.step();
            }
        }
    }

    // Whatever survived must round-trip.
    if let Ok(bytes) = engine.serialize() {
        let restored = Engine::deserialize(&bytes, test_registry()).unwrap();
        assert_eq!(restored.state_hash(), engine.state_hash());
    }
});
