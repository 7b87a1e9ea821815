pub mod background;
pub mod cli;
pub mod config;
pub mod geometry;
pub mod ingest;
pub mod media;
pub mod normalize;
pub mod progress;
pub mod utils;

pub use background::{BackgroundPolicy, BlurBackgroundBuilder, StaticBackground};
pub use config::Config;
pub use geometry::{AspectClass, Offset, Size};
pub use ingest::{IngestionController, JobDispatcher, JobOutcome, Pipeline};
pub use media::{MediaAsset, MediaKind};
pub use normalize::{CompositionSpec, ImageNormalizer, NormalizeOutcome, VideoNormalizer};
pub use utils::{Error, FfmpegWrapper, Result};
