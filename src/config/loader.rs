use super::types::*;
use crate::geometry::{classify_aspect, AspectClass};
use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_CONFIG_DIR: &str = "aspect-normalizer";
const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub progress: ProgressConfig,
    pub canvas: CanvasConfig,
    pub background: BackgroundConfig,
    pub acceptance: AcceptancePolicy,
    pub image_output: ImageOutputConfig,
    pub render: RenderConfig,
    pub ingestion: IngestionConfig,
    pub shutdown: ShutdownConfig,
}

impl Config {
    /// Parses a YAML file. Validation is left to the caller so command-line
    /// overrides can be applied first.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    /// Loads `config_path` if it exists, then the per-user config file, then defaults.
    pub fn load_with_fallback<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if config_path.exists() {
            debug!("Loading configuration from {}", config_path.display());
            return Self::load(config_path);
        }

        if let Some(user_config) = Self::user_config_path().filter(|p| p.exists()) {
            debug!("Loading configuration from {}", user_config.display());
            return Self::load(user_config);
        }

        debug!("No configuration file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        let canvas = &self.canvas;
        if canvas.width == 0 || canvas.height == 0 {
            return Err(Error::configuration(format!(
                "Canvas dimensions must be positive, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        if canvas.width % 2 != 0 || canvas.height % 2 != 0 {
            return Err(Error::configuration(format!(
                "Canvas dimensions must be even for yuv420p output, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        if classify_aspect(canvas.width, canvas.height)? != AspectClass::Horizontal16x9 {
            return Err(Error::configuration(format!(
                "Canvas {}x{} is not 16:9",
                canvas.width, canvas.height
            )));
        }

        match self.background.mode {
            BackgroundMode::Static if self.background.path.is_none() => {
                return Err(Error::configuration(
                    "background.path is required when background.mode is static",
                ));
            }
            BackgroundMode::Blurred if self.background.blur_radius <= 0.0 => {
                return Err(Error::configuration(format!(
                    "background.blur_radius must be greater than 0, got {}",
                    self.background.blur_radius
                )));
            }
            _ => {}
        }

        if self.image_output.mode == ImageOutputMode::Video && self.image_output.duration_secs == 0
        {
            return Err(Error::configuration(
                "image_output.duration_secs must be greater than 0",
            ));
        }

        if self.render.fps == 0 {
            return Err(Error::configuration("render.fps must be greater than 0"));
        }
        if self.render.crf > 51 {
            return Err(Error::configuration(format!(
                "Invalid CRF value: {} (must be between 0 and 51)",
                self.render.crf
            )));
        }
        if self.render.timeout_secs == 0 {
            return Err(Error::configuration(
                "render.timeout_secs must be greater than 0",
            ));
        }

        let ingestion = &self.ingestion;
        if ingestion.poll_interval_ms == 0 {
            return Err(Error::configuration(
                "ingestion.poll_interval_ms must be greater than 0",
            ));
        }
        if ingestion.max_concurrent_jobs == 0 {
            return Err(Error::configuration(
                "ingestion.max_concurrent_jobs must be at least 1",
            ));
        }
        if ingestion.video_extensions.is_empty() || ingestion.image_extensions.is_empty() {
            return Err(Error::configuration(
                "Both video_extensions and image_extensions must be non-empty",
            ));
        }
        for ext in &ingestion.video_extensions {
            if ingestion
                .image_extensions
                .iter()
                .any(|other| normalize_extension(other) == normalize_extension(ext))
            {
                return Err(Error::configuration(format!(
                    "Extension '{}' is listed as both video and image",
                    ext
                )));
            }
        }
        match &ingestion.settle {
            SettleConfig::StableSize {
                sample_interval_ms, ..
            } if *sample_interval_ms == 0 => {
                return Err(Error::configuration(
                    "settle.sample_interval_ms must be greater than 0",
                ));
            }
            _ => {}
        }

        if self.app.input_dir == self.app.output_dir {
            return Err(Error::configuration(format!(
                "Input and output directories must differ: {}",
                self.app.input_dir.display()
            )));
        }

        Ok(())
    }
}

/// Lowercases an extension and strips any leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                input_dir: PathBuf::from("input"),
                output_dir: PathBuf::from("output"),
            },
            tools: ToolsConfig {
                ffmpeg: "ffmpeg".to_string(),
                ffprobe: "ffprobe".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                show_timestamps: true,
                colored_output: true,
            },
            progress: ProgressConfig {
                show_bar: true,
                update_interval_ms: 1000,
            },
            canvas: CanvasConfig {
                width: 1920,
                height: 1080,
            },
            background: BackgroundConfig {
                mode: BackgroundMode::Blurred,
                path: None,
                blur_radius: 30.0,
            },
            acceptance: AcceptancePolicy::NonWidescreen,
            image_output: ImageOutputConfig {
                mode: ImageOutputMode::Video,
                duration_secs: 7,
            },
            render: RenderConfig {
                fps: 30,
                video_codec: "libx264".to_string(),
                preset: "medium".to_string(),
                crf: 18,
                pixel_format: "yuv420p".to_string(),
                audio_codec: "aac".to_string(),
                audio_bitrate: "192k".to_string(),
                threads: 4,
                timeout_secs: 3600,
                min_output_bytes: 1000,
            },
            ingestion: IngestionConfig {
                poll_interval_ms: 1000,
                scan_existing: true,
                max_concurrent_jobs: 1,
                output_suffix: String::new(),
                video_extensions: [".mp4", ".mov", ".avi", ".mkv", ".webm", ".wmv", ".flv"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                image_extensions: [".jpg", ".jpeg", ".png", ".webp"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                settle: SettleConfig::default(),
            },
            shutdown: ShutdownConfig {
                drain_timeout_secs: 30,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        match config.validate() {
            Ok(()) => {}
            Err(e) => panic!("Config validation failed: {}", e),
        }
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.ingestion.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.canvas = CanvasConfig {
            width: 1080,
            height: 1080,
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.canvas = CanvasConfig {
            width: 1279,
            height: 720,
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.background.mode = BackgroundMode::Static;
        config.background.path = None;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingestion.image_extensions.push("MP4".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.app.output_dir = config.app.input_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_string() {
        let yaml = r#"
app:
  input_dir: "/srv/inbox"
  output_dir: "/srv/outbox"

tools:
  ffmpeg: "ffmpeg"
  ffprobe: "ffprobe"

logging:
  level: "debug"
  show_timestamps: false
  colored_output: true

progress:
  show_bar: false
  update_interval_ms: 500

canvas:
  width: 1280
  height: 720

background:
  mode: static
  path: "background.jpg"
  blur_radius: 20

acceptance: vertical_only

image_output:
  mode: still
  duration_secs: 7

render:
  fps: 30
  video_codec: "libx264"
  preset: "fast"
  crf: 18
  pixel_format: "yuv420p"
  audio_codec: "aac"
  audio_bitrate: "192k"
  threads: 4
  timeout_secs: 600
  min_output_bytes: 1000

ingestion:
  poll_interval_ms: 250
  scan_existing: false
  max_concurrent_jobs: 2
  output_suffix: "_16x9"
  video_extensions: [".mp4", ".mov"]
  image_extensions: [".jpg", ".png"]
  settle:
    mode: fixed_delay
    delay_ms: 2000

shutdown:
  drain_timeout_secs: 10
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.canvas.width, 1280);
        assert_eq!(config.background.mode, BackgroundMode::Static);
        assert_eq!(config.acceptance, AcceptancePolicy::VerticalOnly);
        assert_eq!(config.image_output.mode, ImageOutputMode::Still);
        assert_eq!(config.ingestion.output_suffix, "_16x9");
        assert_eq!(
            config.ingestion.settle,
            SettleConfig::FixedDelay { delay_ms: 2000 }
        );
    }

    #[test]
    fn test_load_with_fallback_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.render.crf = 23;
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::load_with_fallback(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".MP4"), "mp4");
        assert_eq!(normalize_extension("jpeg"), "jpeg");
    }
}
