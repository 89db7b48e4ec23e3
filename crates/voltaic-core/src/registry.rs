//! Block type registry.
//!
//! Two-phase lifecycle: registration, then sealing. Built-in and plugin
//! types are registered the same way through [`BlockRegistry::register`]
//! (or a [`Plugin`]); the engine seals the registry on its first run, after
//! which it is read-only and needs no locking.

use crate::block::{BlockBehavior, BlockInstance};
use crate::coord::Coord;
use crate::id::BlockTypeId;
use crate::state::{BlockState, StateError};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered block type.
#[derive(Debug, Clone)]
pub struct BlockType {
    pub id: BlockTypeId,
    pub behavior: Arc<dyn BlockBehavior>,
}

/// An external collaborator that contributes block types before the
/// simulation starts.
pub trait Plugin {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Register every block type this plugin provides.
    fn register(&self, registry: &mut BlockRegistry) -> Result<(), RegistryError>;
}

#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    types: Vec<BlockType>,
    by_id: HashMap<BlockTypeId, usize>,
    sealed: bool,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `behavior`.
    pub fn register(
        &mut self,
        id: BlockTypeId,
        behavior: impl BlockBehavior + 'static,
    ) -> Result<(), RegistryError> {
        self.register_shared(id, Arc::new(behavior))
    }

    /// Bind `id` to an already shared behavior.
    pub fn register_shared(
        &mut self,
        id: BlockTypeId,
        behavior: Arc<dyn BlockBehavior>,
    ) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Locked(id));
        }
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateType(id));
        }
        log::debug!("registered block type {id}");
        self.by_id.insert(id.clone(), self.types.len());
        self.types.push(BlockType { id, behavior });
        Ok(())
    }

    /// Let a plugin register its types.
    pub fn install(&mut self, plugin: &dyn Plugin) -> Result<(), RegistryError> {
        log::debug!("installing plugin {} {}", plugin.name(), plugin.version());
        plugin.register(self)
    }

    /// Freeze the registry. Idempotent.
    pub fn seal(&mut self) {
        if !self.sealed {
            log::debug!("block registry sealed with {} types", self.types.len());
            self.sealed = true;
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Build a new instance of `id` at `position` from `state`.
    pub fn construct(
        &self,
        id: &BlockTypeId,
        state: BlockState,
        position: Coord,
    ) -> Result<BlockInstance, RegistryError> {
        let ty = self
            .get(id)
            .ok_or_else(|| RegistryError::UnknownType(id.clone()))?;
        let state = ty
            .behavior
            .construct(state, position)
            .map_err(|source| RegistryError::InvalidState {
                block_type: id.clone(),
                position,
                source,
            })?;
        Ok(BlockInstance::new(
            id.clone(),
            position,
            state,
            Arc::clone(&ty.behavior),
        ))
    }

    pub fn get(&self, id: &BlockTypeId) -> Option<&BlockType> {
        self.by_id.get(id).map(|&i| &self.types[i])
    }

    pub fn contains(&self, id: &BlockTypeId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown block type {0}")]
    UnknownType(BlockTypeId),
    #[error("block type {0} is already registered")]
    DuplicateType(BlockTypeId),
    #[error("registry is sealed, cannot register {0}")]
    Locked(BlockTypeId),
    #[error("invalid state for {block_type} at {position}: {source}")]
    InvalidState {
        block_type: BlockTypeId,
        position: Coord,
        #[source]
        source: StateError,
    },
}
