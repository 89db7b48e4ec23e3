use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;

new_key_type! {
    /// Identifies a block instance inside one engine's spatial index.
    pub struct BlockId;
}

/// Identifies a block type by `(namespace, name)`. Displayed as `namespace:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockTypeId {
    pub namespace: String,
    pub name: String,
}

impl BlockTypeId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Error parsing a `namespace:name` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block type id '{0}', expected 'namespace:name'")]
pub struct ParseBlockTypeIdError(pub String);

impl FromStr for BlockTypeId {
    type Err = ParseBlockTypeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains(':') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(ParseBlockTypeIdError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_id_display() {
        let id = BlockTypeId::new("default", "wire");
        assert_eq!(id.to_string(), "default:wire");
    }

    #[test]
    fn block_type_id_parse() {
        let id: BlockTypeId = "default:delayer".parse().unwrap();
        assert_eq!(id, BlockTypeId::new("default", "delayer"));
    }

    #[test]
    fn block_type_id_parse_rejects_malformed() {
        assert!("wire".parse::<BlockTypeId>().is_err());
        assert!(":wire".parse::<BlockTypeId>().is_err());
        assert!("default:".parse::<BlockTypeId>().is_err());
        assert!("a:b:c".parse::<BlockTypeId>().is_err());
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(BlockTypeId::new("default", "power"), 1);
        map.insert(BlockTypeId::new("default", "wire"), 2);
        assert_eq!(map[&BlockTypeId::new("default", "wire")], 2);
    }
}
