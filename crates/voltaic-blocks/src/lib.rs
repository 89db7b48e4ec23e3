//! Built-in block types for the Voltaic engine.
//!
//! Four signal blocks in the `default` namespace, installed through
//! [`BuiltinBlocks`] like any third-party plugin:
//!
//! - [`power::Power`] -- a constant source at full strength.
//! - [`lever::Lever`] -- a switchable source, toggled by delivered events.
//! - [`wire::Wire`] -- carries the strongest adjacent signal, one weaker.
//! - [`delayer::Delayer`] -- repeats its input after a fixed number of ticks.
//!
//! # Signals
//!
//! Every block exposes its output strength as an integer `signal` property
//! in `0..=MAX_SIGNAL`. A block with a directional `facing` reads from the
//! side it faces and outputs on the opposite side; a block without a facing,
//! or facing `omni`, outputs on every side.

pub mod delayer;
pub mod lever;
pub mod power;
pub mod wire;

use voltaic_core::block::BlockInstance;
use voltaic_core::coord::{Coord, Facing};
use voltaic_core::id::BlockTypeId;
use voltaic_core::registry::{BlockRegistry, Plugin, RegistryError};

/// Namespace of every built-in type.
pub const NAMESPACE: &str = "default";

/// Full signal strength.
pub const MAX_SIGNAL: i64 = 16;

pub fn power_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "power")
}

pub fn lever_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "lever")
}

pub fn wire_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "wire")
}

pub fn delayer_type() -> BlockTypeId {
    BlockTypeId::new(NAMESPACE, "delayer")
}

// ---------------------------------------------------------------------------
// Signal helpers
// ---------------------------------------------------------------------------

/// Whether `block` drives the coordinate `target`.
pub fn outputs_toward(block: &BlockInstance, target: Coord) -> bool {
    match block.state().get_facing("facing") {
        None | Some(Facing::Omni) => true,
        Some(facing) => block.position().offset(facing.reciprocal()) == Some(target),
    }
}

/// The signal `block` presents to `target`: its `signal` property if it
/// outputs toward `target`, otherwise 0.
pub fn signal_toward(block: &BlockInstance, target: Coord) -> i64 {
    if outputs_toward(block, target) {
        block.state().get_int("signal").unwrap_or(0).clamp(0, MAX_SIGNAL)
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Registers the built-in block types.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinBlocks;

impl Plugin for BuiltinBlocks {
    fn name(&self) -> &str {
        "voltaic-blocks"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn register(&self, registry: &mut BlockRegistry) -> Result<(), RegistryError> {
        registry.register(power_type(), power::Power::new())?;
        registry.register(lever_type(), lever::Lever::new())?;
        registry.register(wire_type(), wire::Wire::new())?;
        registry.register(delayer_type(), delayer::Delayer::new())?;
        Ok(())
    }
}

/// A registry holding only the built-in types.
pub fn builtin_registry() -> Result<BlockRegistry, RegistryError> {
    let mut registry = BlockRegistry::new();
    registry.install(&BuiltinBlocks)?;
    Ok(registry)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use voltaic_core::state::BlockState;

    #[test]
    fn plugin_registers_all_builtins_in_order() {
        let registry = builtin_registry().unwrap();
        let ids: Vec<String> = registry.iter().map(|t| t.id.to_string()).collect();
        assert_eq!(
            ids,
            vec!["default:power", "default:lever", "default:wire", "default:delayer"]
        );
    }

    #[test]
    fn installing_twice_is_a_duplicate() {
        let mut registry = builtin_registry().unwrap();
        let err = registry.install(&BuiltinBlocks).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType(power_type()));
    }

    #[test]
    fn directional_block_outputs_on_back_side() {
        let mut engine = engine();
        let at = Coord::new(0, 0, 0);
        place(
            &mut engine,
            delayer_type(),
            BlockState::new().with("facing", Facing::North).with("delay", 1),
            at,
        );
        let delayer = engine.block(at).unwrap();
        assert!(outputs_toward(delayer, Coord::new(-1, 0, 0)));
        assert!(!outputs_toward(delayer, Coord::new(1, 0, 0)));
        assert!(!outputs_toward(delayer, Coord::new(0, 0, 1)));
    }

    #[test]
    fn undirected_block_outputs_everywhere() {
        let mut engine = engine();
        place(&mut engine, power_type(), BlockState::new(), Coord::ORIGIN);
        let power = engine.block(Coord::ORIGIN).unwrap();
        for f in Facing::DIRECTIONS {
            let side = Coord::ORIGIN.offset(f).unwrap();
            assert!(outputs_toward(power, side));
            assert_eq!(signal_toward(power, side), MAX_SIGNAL);
        }
    }
}
