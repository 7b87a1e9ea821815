pub mod loader;
pub mod types;

pub use loader::{normalize_extension, Config};
pub use types::*;
