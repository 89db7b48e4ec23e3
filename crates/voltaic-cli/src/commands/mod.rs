pub mod check;
pub mod run;

use std::path::Path;

use anyhow::Context;
use voltaic_blocks::builtin_registry;
use voltaic_core::engine::Engine;
use voltaic_data::load_layout;

/// Load a layout file and build an engine with the built-in blocks.
pub fn load_engine(path: &Path) -> anyhow::Result<Engine> {
    let layout = load_layout(path)?;
    let registry = builtin_registry().context("registering built-in blocks")?;
    let engine = layout
        .build_engine(registry)
        .with_context(|| format!("building {}", path.display()))?;
    Ok(engine)
}
