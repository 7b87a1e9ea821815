//! Background resolution for the composite canvas
//!
//! Either a pre-authored static image, validated once at startup, or a blurred
//! derivative of the source built per job by [`BlurBackgroundBuilder`].

use crate::config::{BackgroundConfig, BackgroundMode};
use crate::geometry::{classify_aspect, cover_region, AspectClass, Size};
use crate::utils::{Error, Result};
use image::{imageops, imageops::FilterType, DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A 16:9 background image already resized to the canvas.
#[derive(Debug, Clone)]
pub struct StaticBackground {
    path: PathBuf,
    canvas_pixels: Arc<RgbaImage>,
}

impl StaticBackground {
    /// Loads and validates the background. Any failure here is fatal configuration.
    pub fn load<P: AsRef<Path>>(path: P, canvas: Size) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::configuration(format!(
                "Background image not found: {}",
                path.display()
            )));
        }

        let (width, height) = image::image_dimensions(path).map_err(|e| {
            Error::configuration(format!(
                "Cannot read background image {}: {}",
                path.display(),
                e
            ))
        })?;

        let aspect = classify_aspect(width, height).map_err(|_| {
            Error::configuration(format!(
                "Background image {} has invalid dimensions {}x{}",
                path.display(),
                width,
                height
            ))
        })?;
        if aspect != AspectClass::Horizontal16x9 {
            return Err(Error::configuration(format!(
                "Background image {} is {}x{}, expected a 16:9 image",
                path.display(),
                width,
                height
            )));
        }

        let decoded = image::open(path).map_err(|e| {
            Error::configuration(format!(
                "Cannot decode background image {}: {}",
                path.display(),
                e
            ))
        })?;
        let resized = decoded
            .resize_exact(canvas.width, canvas.height, FilterType::Lanczos3)
            .to_rgba8();

        info!(
            "Loaded background {} ({}x{} -> {})",
            path.display(),
            width,
            height,
            canvas
        );

        Ok(Self {
            path: path.to_path_buf(),
            canvas_pixels: Arc::new(resized),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canvas-sized RGBA copy of the background, ready to paint on.
    pub fn canvas_image(&self) -> RgbaImage {
        self.canvas_pixels.as_ref().clone()
    }
}

/// How each job's background is obtained. Chosen once from configuration.
#[derive(Debug, Clone)]
pub enum BackgroundPolicy {
    Static(StaticBackground),
    Blurred(BlurBackgroundBuilder),
}

impl BackgroundPolicy {
    pub fn from_config(config: &BackgroundConfig, canvas: Size) -> Result<Self> {
        match config.mode {
            BackgroundMode::Static => {
                let path = config.path.as_ref().ok_or_else(|| {
                    Error::configuration("background.path is required for static backgrounds")
                })?;
                Ok(Self::Static(StaticBackground::load(path, canvas)?))
            }
            BackgroundMode::Blurred => Ok(Self::Blurred(BlurBackgroundBuilder::new(
                canvas,
                config.blur_radius,
            )?)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Static(background) => format!("static {}", background.path().display()),
            Self::Blurred(builder) => format!("blurred (radius {})", builder.radius()),
        }
    }
}

/// Builds cover-scaled, center-cropped, blurred backgrounds at exact canvas size.
#[derive(Debug, Clone, Copy)]
pub struct BlurBackgroundBuilder {
    canvas: Size,
    radius: f32,
}

impl BlurBackgroundBuilder {
    pub fn new(canvas: Size, radius: f32) -> Result<Self> {
        let canvas = canvas.validated()?;
        if !(radius > 0.0) {
            return Err(Error::configuration(format!(
                "Blur radius must be greater than 0, got {}",
                radius
            )));
        }
        Ok(Self { canvas, radius })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Cover-scale, crop to canvas, then blur. The crop is taken in source space and
    /// only that region is resized, so memory stays at one canvas whatever the source
    /// aspect. The blur runs on the canvas so the radius is measured in output pixels.
    pub fn build_image(&self, source: &DynamicImage) -> Result<RgbaImage> {
        let source_size = Size::new(source.width(), source.height());
        if source_size.width == 0 || source_size.height == 0 {
            return Err(Error::degenerate_source(format!(
                "Cannot derive a background from a {} frame",
                source_size
            )));
        }

        let (offset, region) = cover_region(source_size, self.canvas)?;
        debug!(
            "Blurred background: {} -> crop {} at ({}, {}) -> {}",
            source_size, region, offset.x, offset.y, self.canvas
        );

        let cropped = source.crop_imm(offset.x, offset.y, region.width, region.height);
        let scaled = cropped
            .resize_exact(self.canvas.width, self.canvas.height, FilterType::Triangle)
            .to_rgba8();

        Ok(imageops::blur(&scaled, self.radius))
    }

    /// ffmpeg filter chain doing the same cover/crop/blur on every frame of `input`,
    /// labelled `output`.
    pub fn video_filter(&self, input: &str, output: &str) -> String {
        let Size { width, height } = self.canvas;
        format!(
            "[{input}]scale={width}:{height}:force_original_aspect_ratio=increase,\
             crop={width}:{height},setsar=1,gblur=sigma={radius}[{output}]",
            radius = self.radius,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_image(path: &Path, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_missing_background_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_background.jpg");

        let err = StaticBackground::load(&missing, Size::new(1280, 720)).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("no_such_background.jpg"));
    }

    #[test]
    fn test_non_widescreen_background_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.png");
        write_image(&path, 64, 64);

        let err = StaticBackground::load(&path, Size::new(1280, 720)).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_static_background_resized_to_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        write_image(&path, 160, 90);

        let background = StaticBackground::load(&path, Size::new(320, 180)).unwrap();
        let canvas = background.canvas_image();
        assert_eq!(canvas.dimensions(), (320, 180));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_blurred_background_matches_canvas_exactly() {
        let builder = BlurBackgroundBuilder::new(Size::new(320, 180), 4.0).unwrap();
        for (w, h) in [(90, 160), (500, 500), (1000, 100), (320, 180)] {
            let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                w,
                h,
                Rgba([200, 100, 50, 255]),
            ));
            let background = builder.build_image(&source).unwrap();
            assert_eq!(background.dimensions(), (320, 180), "source {}x{}", w, h);
        }
    }

    #[test]
    fn test_extreme_strip_builds_canvas_sized_background() {
        let builder = BlurBackgroundBuilder::new(Size::new(1920, 1080), 30.0).unwrap();
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            10,
            10000,
            Rgba([0, 128, 255, 255]),
        ));

        let background = builder.build_image(&source).unwrap();
        assert_eq!(background.dimensions(), (1920, 1080));
        let center = background.get_pixel(960, 540);
        for (got, want) in center.0.iter().zip([0u8, 128, 255]) {
            assert!(got.abs_diff(want) <= 1, "center pixel {:?}", center);
        }
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(BlurBackgroundBuilder::new(Size::new(1280, 720), 0.0).is_err());
    }

    #[test]
    fn test_video_filter_covers_then_blurs() {
        let builder = BlurBackgroundBuilder::new(Size::new(1280, 720), 30.0).unwrap();
        let filter = builder.video_filter("bgsrc", "bg");
        assert_eq!(
            filter,
            "[bgsrc]scale=1280:720:force_original_aspect_ratio=increase,\
             crop=1280:720,setsar=1,gblur=sigma=30[bg]"
        );
    }
}
