//! Turning one accepted source file into one 16:9 output.

pub mod composition;
pub mod filters;
pub mod image;
pub mod video;

pub use composition::{BackgroundSource, CompositionSpec};
pub use filters::{FilterGraph, RenderArgsBuilder};
pub use self::image::ImageNormalizer;
pub use video::{accepts, VideoNormalizer};

use crate::background::{BackgroundPolicy, BlurBackgroundBuilder};
use std::path::PathBuf;

/// What a normalizer did with a source.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    Rendered { output: PathBuf, bytes: u64 },
    /// Source was valid but deliberately left alone.
    Skipped { reason: String },
}

pub(crate) fn background_source(
    policy: &BackgroundPolicy,
) -> (BackgroundSource, Option<&BlurBackgroundBuilder>) {
    match policy {
        BackgroundPolicy::Static(background) => (
            BackgroundSource::StaticImage(background.path().to_path_buf()),
            None,
        ),
        BackgroundPolicy::Blurred(builder) => (
            BackgroundSource::BlurredDerivative {
                radius: builder.radius(),
            },
            Some(builder),
        ),
    }
}
