//! Layout loading: reads a data file, resolves type ids, builds an engine.
//!
//! Provides format detection (RON/JSON/TOML) by file extension and the
//! deserialization helpers the higher-level [`load_layout`] pipeline uses.

use crate::schema::{BlockData, EventData, LayoutData};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use voltaic_core::coord::Coord;
use voltaic_core::delay::{ScheduleError, ScheduledEvent};
use voltaic_core::engine::{Engine, EngineError};
use voltaic_core::id::BlockTypeId;
use voltaic_core::registry::BlockRegistry;
use voltaic_core::sim::SimConfig;
use voltaic_core::state::{BlockState, Value};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A block type was not written as `namespace:name`.
    #[error("invalid block type '{value}' in {file}")]
    InvalidTypeId { file: PathBuf, value: String },

    /// The engine rejected a block from the layout.
    #[error("block {index} in {file}: {source}")]
    Engine {
        file: PathBuf,
        index: usize,
        #[source]
        source: EngineError,
    },

    /// A queued stimulus could not be scheduled.
    #[error("event {index} in {file}: {source}")]
    Schedule {
        file: PathBuf,
        index: usize,
        #[source]
        source: ScheduleError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Parse `content` in the given format. `path` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Resolution
// ===========================================================================

/// A layout with every type id and value resolved, ready to build an engine.
#[derive(Debug, Clone)]
pub struct Layout {
    /// File the layout came from, for error messages.
    pub source: PathBuf,
    pub config: SimConfig,
    pub blocks: Vec<(BlockTypeId, BlockState, Coord)>,
    pub events: Vec<ScheduledEvent>,
}

fn resolve_block(
    block: BlockData,
    file: &Path,
) -> Result<(BlockTypeId, BlockState, Coord), DataLoadError> {
    let block_type: BlockTypeId = block.block_type.parse().map_err(|_| {
        DataLoadError::InvalidTypeId {
            file: file.to_path_buf(),
            value: block.block_type.clone(),
        }
    })?;
    let state: BlockState = block
        .state
        .into_iter()
        .map(|(name, value)| (name, Value::from(value)))
        .collect();
    Ok((block_type, state, Coord::from(block.position)))
}

fn resolve_event(event: EventData) -> ScheduledEvent {
    let scheduled = ScheduledEvent::new(
        Coord::from(event.target),
        event.tick,
        Value::from(event.value),
    );
    match event.channel {
        Some(channel) => scheduled.with_channel(&channel),
        None => scheduled,
    }
}

impl Layout {
    /// Resolve raw layout data read from `file`.
    pub fn resolve(data: LayoutData, file: &Path) -> Result<Self, DataLoadError> {
        let blocks = data
            .blocks
            .into_iter()
            .map(|b| resolve_block(b, file))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: file.to_path_buf(),
            config: data.config,
            blocks,
            events: data.events.into_iter().map(resolve_event).collect(),
        })
    }

    /// Build an engine from `registry` and place every block, then queue
    /// every event. Blocks are placed in file order; the first rejected
    /// block aborts the build.
    pub fn build_engine(self, registry: BlockRegistry) -> Result<Engine, DataLoadError> {
        let mut engine = Engine::with_registry(registry, self.config);
        for (index, (block_type, state, position)) in self.blocks.into_iter().enumerate() {
            engine
                .add_block(&block_type, state, position)
                .map_err(|source| DataLoadError::Engine {
                    file: self.source.clone(),
                    index,
                    source,
                })?;
        }
        for (index, event) in self.events.into_iter().enumerate() {
            engine
                .schedule(event)
                .map_err(|source| DataLoadError::Schedule {
                    file: self.source.clone(),
                    index,
                    source,
                })?;
        }
        log::debug!(
            "built engine from {} with {} blocks",
            self.source.display(),
            engine.block_count()
        );
        Ok(engine)
    }
}

/// Load and resolve a layout file. The format is picked by extension.
pub fn load_layout(path: &Path) -> Result<Layout, DataLoadError> {
    let data: LayoutData = deserialize_file(path)?;
    Layout::resolve(data, path)
}
