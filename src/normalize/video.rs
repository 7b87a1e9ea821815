use crate::background::BackgroundPolicy;
use crate::config::{AcceptancePolicy, Config, ProgressConfig, RenderConfig};
use crate::geometry::{classify_aspect, AspectClass, Size};
use crate::media::MediaAsset;
use crate::normalize::composition::CompositionSpec;
use crate::normalize::filters::RenderArgsBuilder;
use crate::normalize::{background_source, NormalizeOutcome};
use crate::progress::RenderProgress;
use crate::utils::filesystem::TempOutput;
use crate::utils::{FfmpegWrapper, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Whether a video of class `aspect` is normalized under `policy`.
pub fn accepts(policy: AcceptancePolicy, aspect: AspectClass) -> bool {
    match policy {
        AcceptancePolicy::VerticalOnly => aspect == AspectClass::Vertical9x16,
        AcceptancePolicy::NonWidescreen => aspect != AspectClass::Horizontal16x9,
    }
}

/// Probes, gates and renders video sources.
#[derive(Clone)]
pub struct VideoNormalizer {
    canvas: Size,
    background: Arc<BackgroundPolicy>,
    acceptance: AcceptancePolicy,
    render: RenderConfig,
    progress: ProgressConfig,
    ffmpeg: FfmpegWrapper,
}

impl VideoNormalizer {
    pub fn new(config: &Config, background: Arc<BackgroundPolicy>, ffmpeg: FfmpegWrapper) -> Self {
        Self {
            canvas: Size::new(config.canvas.width, config.canvas.height),
            background,
            acceptance: config.acceptance,
            render: config.render.clone(),
            progress: config.progress.clone(),
            ffmpeg,
        }
    }

    pub async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<NormalizeOutcome> {
        let metadata = self.ffmpeg.probe(input).await?;
        let asset = MediaAsset::video(input, &metadata);
        asset.ensure_renderable()?;

        let aspect = classify_aspect(asset.width, asset.height)?;
        debug!(
            "{}: {} {} ({}s, rotation {}, audio {})",
            asset.file_name(),
            asset.size(),
            aspect,
            asset.duration_seconds,
            asset.rotation_degrees,
            asset.has_audio
        );

        if !accepts(self.acceptance, aspect) {
            return Ok(NormalizeOutcome::Skipped {
                reason: format!(
                    "{} is {} ({}), not accepted by {} policy",
                    asset.file_name(),
                    asset.size(),
                    aspect,
                    self.acceptance.as_str()
                ),
            });
        }

        let (source, blur) = background_source(&self.background);
        let duration = asset.duration_seconds;
        let label = asset.file_name();
        let spec = CompositionSpec::resolve(self.canvas, source, asset, duration)?;

        let temp = TempOutput::new(output, "partial");
        let args = RenderArgsBuilder::new(&self.render).video_args(&spec, blur, temp.path());

        info!(
            "Rendering {} -> {} (foreground {} at {},{})",
            label,
            output.display(),
            spec.foreground_size,
            spec.foreground_offset.x,
            spec.foreground_offset.y
        );

        let mut progress = RenderProgress::new(&label, duration, &self.progress);
        if let Err(e) = self
            .ffmpeg
            .render(&args, cancel, |line| progress.update(line))
            .await
        {
            progress.abandon();
            return Err(e);
        }
        progress.finish();

        let bytes = temp.commit(output, self.render.min_output_bytes)?;
        Ok(NormalizeOutcome::Rendered {
            output: output.to_path_buf(),
            bytes,
        })
    }
}
