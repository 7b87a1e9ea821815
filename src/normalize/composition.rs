use crate::geometry::{center_offset, fit_size, scale_to_fit, Offset, Size};
use crate::media::MediaAsset;
use crate::utils::Result;

/// Where the background comes from for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    StaticImage(std::path::PathBuf),
    BlurredDerivative { radius: f32 },
}

/// Fully resolved instructions for one render. Built fresh per job.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSpec {
    pub canvas: Size,
    pub background: BackgroundSource,
    pub foreground: MediaAsset,
    pub foreground_scale: f64,
    pub foreground_size: Size,
    pub foreground_offset: Offset,
    pub duration_seconds: f64,
}

impl CompositionSpec {
    /// Fits the foreground inside the canvas and centers it.
    pub fn resolve(
        canvas: Size,
        background: BackgroundSource,
        foreground: MediaAsset,
        duration_seconds: f64,
    ) -> Result<Self> {
        foreground.ensure_renderable()?;
        let source = foreground.size();
        let foreground_scale = scale_to_fit(source, canvas)?;
        let foreground_size = fit_size(source, canvas)?;
        let foreground_offset = center_offset(canvas, foreground_size)?;

        Ok(Self {
            canvas,
            background,
            foreground,
            foreground_scale,
            foreground_size,
            foreground_offset,
            duration_seconds,
        })
    }
}
