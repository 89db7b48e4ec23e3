//! Typed block state and per-type state schemas.
//!
//! A [`BlockState`] is an ordered map of property name to [`Value`]. Every
//! block type declares a [`StateSchema`]; construction and every proposed
//! update are validated against it, which also fills in defaults.

use crate::coord::Facing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Enum(String),
    Facing(Facing),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Enum(_) => "enum",
            Value::Facing(_) => "facing",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_facing(&self) -> Option<Facing> {
        match self {
            Value::Facing(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Enum(s) => f.write_str(s),
            Value::Facing(facing) => write!(f, "{facing}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Facing> for Value {
    fn from(v: Facing) -> Self {
        Value::Facing(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Enum(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// BlockState
// ---------------------------------------------------------------------------

/// Property name -> value. Ordered so hashing and reporting are stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockState(BTreeMap<String, Value>);

impl BlockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_facing(&self, name: &str) -> Option<Facing> {
        self.get(name).and_then(Value::as_facing)
    }

    pub fn get_enum(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_enum)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for BlockState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Accepted value domain of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Integer in `min..=max`.
    Int { min: i64, max: i64 },
    Bool,
    /// One of a fixed set of variant names.
    Enum { variants: Vec<String> },
    /// A facing. When `directional` is set, omni is rejected.
    Facing { directional: bool },
}

impl PropertyKind {
    fn name(&self) -> &'static str {
        match self {
            PropertyKind::Int { .. } => "int",
            PropertyKind::Bool => "bool",
            PropertyKind::Enum { .. } => "enum",
            PropertyKind::Facing { .. } => "facing",
        }
    }
}

/// Describes one property of a block type's state.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    /// `None` marks the property as required.
    pub default: Option<Value>,
}

/// The set of properties a block type accepts.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    properties: Vec<PropertyDef>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, def: PropertyDef) -> Self {
        self.properties.push(def);
        self
    }

    pub fn int(self, name: &str, min: i64, max: i64, default: Option<i64>) -> Self {
        self.property(PropertyDef {
            name: name.to_string(),
            kind: PropertyKind::Int { min, max },
            default: default.map(Value::Int),
        })
    }

    pub fn bool(self, name: &str, default: Option<bool>) -> Self {
        self.property(PropertyDef {
            name: name.to_string(),
            kind: PropertyKind::Bool,
            default: default.map(Value::Bool),
        })
    }

    pub fn enumeration(self, name: &str, variants: &[&str], default: Option<&str>) -> Self {
        self.property(PropertyDef {
            name: name.to_string(),
            kind: PropertyKind::Enum {
                variants: variants.iter().map(|v| v.to_string()).collect(),
            },
            default: default.map(Value::from),
        })
    }

    pub fn facing(self, name: &str, directional: bool, default: Option<Facing>) -> Self {
        self.property(PropertyDef {
            name: name.to_string(),
            kind: PropertyKind::Facing { directional },
            default: default.map(Value::Facing),
        })
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check `state` against the schema, filling defaults for absent
    /// optional properties. Enum strings naming a facing are accepted for
    /// facing properties and vice versa.
    pub fn validate(&self, state: BlockState) -> Result<BlockState, StateError> {
        if let Some((name, _)) = state.iter().find(|(name, _)| self.get(name).is_none()) {
            return Err(StateError::Unknown {
                property: name.to_string(),
            });
        }

        let mut supplied = state.0;
        let mut out = BlockState::new();
        for def in &self.properties {
            let value = match supplied.remove(&def.name) {
                Some(v) => check_value(def, v)?,
                None => def.default.clone().ok_or_else(|| StateError::Missing {
                    property: def.name.clone(),
                })?,
            };
            out.0.insert(def.name.clone(), value);
        }
        Ok(out)
    }
}

fn check_value(def: &PropertyDef, value: Value) -> Result<Value, StateError> {
    let wrong_kind = |found: &Value| StateError::WrongKind {
        property: def.name.clone(),
        expected: def.kind.name(),
        found: found.kind_name(),
    };

    match (&def.kind, value) {
        (PropertyKind::Int { min, max }, Value::Int(v)) => {
            if v < *min || v > *max {
                Err(StateError::OutOfRange {
                    property: def.name.clone(),
                    value: v,
                    min: *min,
                    max: *max,
                })
            } else {
                Ok(Value::Int(v))
            }
        }
        (PropertyKind::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
        (PropertyKind::Enum { variants }, Value::Enum(s)) => {
            if variants.contains(&s) {
                Ok(Value::Enum(s))
            } else {
                Err(StateError::UnknownVariant {
                    property: def.name.clone(),
                    variant: s,
                })
            }
        }
        (PropertyKind::Enum { variants }, Value::Facing(f)) => {
            let s = f.as_str().to_string();
            if variants.contains(&s) {
                Ok(Value::Enum(s))
            } else {
                Err(StateError::UnknownVariant {
                    property: def.name.clone(),
                    variant: s,
                })
            }
        }
        (PropertyKind::Facing { directional }, Value::Facing(f)) => {
            if *directional && f.is_omni() {
                Err(StateError::InvalidFacing {
                    property: def.name.clone(),
                    facing: f.to_string(),
                })
            } else {
                Ok(Value::Facing(f))
            }
        }
        (PropertyKind::Facing { directional }, Value::Enum(s)) => match s.parse::<Facing>() {
            Ok(f) if !(*directional && f.is_omni()) => Ok(Value::Facing(f)),
            _ => Err(StateError::InvalidFacing {
                property: def.name.clone(),
                facing: s,
            }),
        },
        (_, other) => Err(wrong_kind(&other)),
    }
}

/// Reasons a state record is rejected by a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("missing required property '{property}'")]
    Missing { property: String },
    #[error("unknown property '{property}'")]
    Unknown { property: String },
    #[error("property '{property}' expects {expected}, got {found}")]
    WrongKind {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("property '{property}' value {value} outside {min}..={max}")]
    OutOfRange {
        property: String,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("property '{property}' has no variant '{variant}'")]
    UnknownVariant { property: String, variant: String },
    #[error("property '{property}' has invalid facing '{facing}'")]
    InvalidFacing { property: String, facing: String },
}
