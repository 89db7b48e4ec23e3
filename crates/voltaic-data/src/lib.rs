pub mod loader;
pub mod schema;

pub use loader::{load_layout, DataLoadError, Layout};
