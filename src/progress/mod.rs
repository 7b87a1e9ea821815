pub mod tracker;

pub use tracker::{ProgressMetrics, RenderProgress};
