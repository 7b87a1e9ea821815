use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    /// A pre-authored 16:9 image, resized to the canvas and held for the clip duration.
    Static,
    /// A cover-scaled, cropped and blurred copy of the source itself.
    Blurred,
}

impl BackgroundMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Blurred => "blurred",
        }
    }
}

/// Which video sources get normalized. Images are always normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptancePolicy {
    /// Only 9:16 portrait sources; everything else is skipped.
    VerticalOnly,
    /// Anything not already 16:9 within tolerance.
    NonWidescreen,
}

impl AcceptancePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerticalOnly => "vertical_only",
            Self::NonWidescreen => "non_widescreen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutputMode {
    /// Composite written as a still image with the source's extension.
    Still,
    /// Composite held for a fixed duration and rendered to MP4.
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettleConfig {
    FixedDelay {
        delay_ms: u64,
    },
    StableSize {
        sample_interval_ms: u64,
        max_wait_secs: u64,
    },
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self::StableSize {
            sample_interval_ms: 1000,
            max_wait_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub show_timestamps: bool,
    pub colored_output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub show_bar: bool,
    pub update_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub mode: BackgroundMode,
    /// Required when `mode` is `static`.
    pub path: Option<PathBuf>,
    /// Gaussian sigma in canvas pixels for the blurred mode.
    pub blur_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutputConfig {
    pub mode: ImageOutputMode,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub fps: u32,
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub threads: u32,
    pub timeout_secs: u64,
    /// Outputs at or below this size are treated as failed renders.
    pub min_output_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub poll_interval_ms: u64,
    pub scan_existing: bool,
    pub max_concurrent_jobs: usize,
    #[serde(default)]
    pub output_suffix: String,
    pub video_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    #[serde(default)]
    pub settle: SettleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    pub drain_timeout_secs: u64,
}
