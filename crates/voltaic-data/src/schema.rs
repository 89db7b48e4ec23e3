//! Serde data file structs for circuit layouts.
//!
//! These structs define the on-disk format for a layout: optional engine
//! configuration, the blocks to place and any stimuli to queue before the
//! first tick. They are deserialized from RON, JSON, or TOML files and then
//! resolved into engine types by the loader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use voltaic_core::sim::SimConfig;
use voltaic_core::state::Value;

// ===========================================================================
// Values
// ===========================================================================

/// A state property value as written in a data file. Strings become enum
/// values; the block's schema turns facing names into facings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueData {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<ValueData> for Value {
    fn from(v: ValueData) -> Self {
        match v {
            ValueData::Bool(b) => Value::Bool(b),
            ValueData::Int(i) => Value::Int(i),
            ValueData::Str(s) => Value::Enum(s),
        }
    }
}

impl From<&Value> for ValueData {
    fn from(v: &Value) -> Self {
        match v {
            Value::Bool(b) => ValueData::Bool(*b),
            Value::Int(i) => ValueData::Int(*i),
            Value::Enum(s) => ValueData::Str(s.clone()),
            Value::Facing(f) => ValueData::Str(f.as_str().to_string()),
        }
    }
}

// ===========================================================================
// Blocks and events
// ===========================================================================

/// A block placement in a data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockData {
    /// `namespace:name`.
    #[serde(rename = "type")]
    pub block_type: String,
    /// `[x, y, z]`.
    pub position: [i32; 3],
    #[serde(default)]
    pub state: BTreeMap<String, ValueData>,
}

/// An event to queue before the first tick, e.g. flipping a lever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub target: [i32; 3],
    pub tick: u64,
    pub value: ValueData,
    #[serde(default)]
    pub channel: Option<String>,
}

// ===========================================================================
// Layout
// ===========================================================================

/// A whole layout file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub blocks: Vec<BlockData>,
    #[serde(default)]
    pub events: Vec<EventData>,
}
