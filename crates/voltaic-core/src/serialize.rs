//! Serialization and snapshot support for the simulation engine.
//!
//! Provides binary serialization via `bitcode` with a versioned header.
//! Behaviors are code, not data: a snapshot stores each block as
//! `(type id, position, state)` and loading resolves the types against a
//! registry supplied by the caller.

use crate::coord::Coord;
use crate::delay::DelayQueue;
use crate::engine::Engine;
use crate::id::BlockTypeId;
use crate::registry::{BlockRegistry, RegistryError};
use crate::sim::{SimConfig, SimState};
use crate::spatial::SpatialError;
use crate::state::BlockState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a Voltaic engine snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5E17_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("cannot rebuild block: {0}")]
    Registry(#[from] RegistryError),
    #[error("cannot place block: {0}")]
    Spatial(#[from] SpatialError),
    #[error("corrupt delay queue: {0}")]
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the payload is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic number for format detection.
    pub magic: u32,
    /// Format version for forward compatibility.
    pub version: u32,
    /// Clock value at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Read just the snapshot header from serialized data.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    // bitcode has no partial decoding, so the whole snapshot is decoded.
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable engine state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedBlock {
    block_type: BlockTypeId,
    position: Coord,
    state: BlockState,
}

/// The serializable portion of the engine. Excludes the registry, whose
/// behaviors cannot be encoded.
#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    config: SimConfig,
    sim_state: SimState,
    /// In spatial index order.
    blocks: Vec<SavedBlock>,
    queue: DelayQueue,
}

impl Engine {
    /// Serialize the engine state to a binary blob.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = EngineSnapshot {
            header: SnapshotHeader::new(self.sim_state.tick),
            config: self.config.clone(),
            sim_state: self.sim_state.clone(),
            blocks: self
                .index
                .iter()
                .map(|(_, b)| SavedBlock {
                    block_type: b.block_type().clone(),
                    position: b.position(),
                    state: b.state().clone(),
                })
                .collect(),
            queue: self.queue.clone(),
        };

        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Rebuild an engine from a binary blob, resolving block types against
    /// `registry`.
    ///
    /// Validates the snapshot header (magic number, version) before touching
    /// the payload. Returns an error (not a panic) on malformed data, on a
    /// newer format version, when a saved block type is not registered, or
    /// when the delay queue does not fit the saved clock.
    pub fn deserialize(data: &[u8], registry: BlockRegistry) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        snapshot
            .queue
            .verify(snapshot.sim_state.tick)
            .map_err(DeserializeError::Corrupt)?;

        let mut engine = Engine::with_registry(registry, snapshot.config);
        for saved in snapshot.blocks {
            let block = engine
                .registry
                .construct(&saved.block_type, saved.state, saved.position)?;
            engine.index.insert(block)?;
        }
        engine.queue = snapshot.queue;
        engine.sim_state = snapshot.sim_state;
        if engine.sim_state.tick > 0 {
            engine.registry.seal();
        }
        engine.last_state_hash = engine.compute_state_hash();
        engine.hash_dirty = false;

        log::debug!(
            "loaded snapshot at tick {} with {} blocks and {} pending events",
            engine.sim_state.tick,
            engine.index.len(),
            engine.queue.len()
        );
        Ok(engine)
    }
}
