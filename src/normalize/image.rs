use crate::background::BackgroundPolicy;
use crate::config::{Config, ImageOutputConfig, ImageOutputMode, ProgressConfig, RenderConfig};
use crate::geometry::Size;
use crate::media::MediaAsset;
use crate::normalize::composition::CompositionSpec;
use crate::normalize::filters::RenderArgsBuilder;
use crate::normalize::{background_source, NormalizeOutcome};
use crate::progress::RenderProgress;
use crate::utils::filesystem::TempOutput;
use crate::utils::{Error, FfmpegWrapper, Result};
use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Composites still images onto the canvas, either as a still or as a short clip.
#[derive(Clone)]
pub struct ImageNormalizer {
    canvas: Size,
    background: Arc<BackgroundPolicy>,
    output: ImageOutputConfig,
    render: RenderConfig,
    progress: ProgressConfig,
    ffmpeg: FfmpegWrapper,
}

impl ImageNormalizer {
    pub fn new(config: &Config, background: Arc<BackgroundPolicy>, ffmpeg: FfmpegWrapper) -> Self {
        Self {
            canvas: Size::new(config.canvas.width, config.canvas.height),
            background,
            output: config.image_output.clone(),
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
        match self.output.mode {
            ImageOutputMode::Still => self.normalize_still(input, output).await,
            ImageOutputMode::Video => self.normalize_to_video(input, output, cancel).await,
        }
    }

    async fn normalize_still(&self, input: &Path, output: &Path) -> Result<NormalizeOutcome> {
        let format = ImageFormat::from_path(output).map_err(|_| {
            Error::unsupported_format(
                output
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        })?;

        let temp = TempOutput::new(output, "partial");
        self.compose_to_file(input, temp.path(), format).await?;

        let bytes = temp.commit(output, 0)?;
        info!("Wrote still {}", output.display());
        Ok(NormalizeOutcome::Rendered {
            output: output.to_path_buf(),
            bytes,
        })
    }

    async fn normalize_to_video(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<NormalizeOutcome> {
        let frame = TempOutput::new(output, "frame.png");
        self.compose_to_file(input, frame.path(), ImageFormat::Png)
            .await?;

        let duration = f64::from(self.output.duration_secs);
        let temp = TempOutput::new(output, "partial");
        let args = RenderArgsBuilder::new(&self.render).still_video_args(
            frame.path(),
            duration,
            temp.path(),
        );

        let label = file_label(input);
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
        info!("Rendered {} ({}s still clip)", output.display(), self.output.duration_secs);
        Ok(NormalizeOutcome::Rendered {
            output: output.to_path_buf(),
            bytes,
        })
    }

    async fn compose_to_file(&self, input: &Path, target: &Path, format: ImageFormat) -> Result<()> {
        let canvas = self.canvas;
        let background = Arc::clone(&self.background);
        let input: PathBuf = input.to_path_buf();
        let target: PathBuf = target.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let composite = compose_image(&input, canvas, &background)?;
            composite.save_with_format(&target, format)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::render_failed(format!("Image compositing task failed: {}", e)))?
    }
}

/// Decodes `input` and paints it, fitted and centered, over the job's background.
pub fn compose_image(input: &Path, canvas: Size, background: &BackgroundPolicy) -> Result<RgbImage> {
    let decoded = image::open(input).map_err(|e| {
        Error::decode_failed(format!("Cannot decode {}: {}", input.display(), e))
    })?;

    let (source, _) = background_source(background);
    let asset = MediaAsset::image(input, decoded.width(), decoded.height());
    let spec = CompositionSpec::resolve(canvas, source, asset, 0.0)?;

    let mut base = match background {
        BackgroundPolicy::Static(image) => image.canvas_image(),
        BackgroundPolicy::Blurred(builder) => builder.build_image(&decoded)?,
    };

    let foreground = decoded
        .resize_exact(
            spec.foreground_size.width,
            spec.foreground_size.height,
            FilterType::Lanczos3,
        )
        .to_rgba8();
    imageops::overlay(
        &mut base,
        &foreground,
        i64::from(spec.foreground_offset.x),
        i64::from(spec.foreground_offset.y),
    );

    debug!(
        "Composited {} ({} -> {} at {},{})",
        input.display(),
        spec.foreground.size(),
        spec.foreground_size,
        spec.foreground_offset.x,
        spec.foreground_offset.y
    );

    Ok(DynamicImage::ImageRgba8(base).to_rgb8())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BlurBackgroundBuilder;
    use crate::config::CanvasConfig;
    use image::{Rgba, RgbaImage};

    fn still_config() -> Config {
        let mut config = Config::default();
        config.canvas = CanvasConfig {
            width: 320,
            height: 180,
        };
        config.image_output.mode = ImageOutputMode::Still;
        config.progress.show_bar = false;
        config
    }

    fn normalizer(config: &Config) -> ImageNormalizer {
        let blur = BlurBackgroundBuilder::new(Size::new(320, 180), 4.0).unwrap();
        ImageNormalizer::new(
            config,
            Arc::new(BackgroundPolicy::Blurred(blur)),
            FfmpegWrapper::new("ffmpeg".to_string(), "ffprobe".to_string(), 60),
        )
    }

    #[tokio::test]
    async fn test_portrait_still_is_composited_onto_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("portrait.png");
        RgbaImage::from_pixel(90, 160, Rgba([250, 10, 10, 255]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("out").join("portrait.png");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();

        let config = still_config();
        let outcome = normalizer(&config)
            .normalize(&input, &output, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, NormalizeOutcome::Rendered { .. }));
        let written = image::open(&output).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (320, 180));
        // foreground is 101x180 at x=109; its center keeps the source color
        assert_eq!(written.get_pixel(160, 90).0, [250, 10, 10]);
    }

    #[tokio::test]
    async fn test_corrupt_image_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.png");
        std::fs::write(&input, b"definitely not a png").unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let output = out_dir.join("broken.png");

        let config = still_config();
        let err = normalizer(&config)
            .normalize(&input, &output, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DecodeFailed { .. }));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_static_background_shows_around_foreground() {
        let dir = tempfile::tempdir().unwrap();
        let bg_path = dir.path().join("bg.png");
        RgbaImage::from_pixel(160, 90, Rgba([0, 0, 255, 255]))
            .save(&bg_path)
            .unwrap();
        let input = dir.path().join("square.png");
        RgbaImage::from_pixel(50, 50, Rgba([0, 255, 0, 255]))
            .save(&input)
            .unwrap();

        let background = crate::background::StaticBackground::load(&bg_path, Size::new(320, 180))
            .unwrap();
        let composite = compose_image(
            &input,
            Size::new(320, 180),
            &BackgroundPolicy::Static(background),
        )
        .unwrap();

        assert_eq!(composite.dimensions(), (320, 180));
        assert_eq!(composite.get_pixel(5, 5).0, [0, 0, 255]);
        assert_eq!(composite.get_pixel(160, 90).0, [0, 255, 0]);
    }
}
