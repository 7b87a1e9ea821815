use crate::config::{normalize_extension, Config, ImageOutputMode};
use crate::media::MediaKind;
use crate::utils::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const VIDEO_OUTPUT_EXTENSION: &str = "mp4";

/// Maps inbox files to a media kind and a deterministic output path.
#[derive(Debug, Clone)]
pub struct MediaRouter {
    output_dir: PathBuf,
    output_suffix: String,
    video_extensions: HashSet<String>,
    image_extensions: HashSet<String>,
    image_mode: ImageOutputMode,
}

impl MediaRouter {
    pub fn new(config: &Config) -> Self {
        Self {
            output_dir: config.app.output_dir.clone(),
            output_suffix: config.ingestion.output_suffix.clone(),
            video_extensions: config
                .ingestion
                .video_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            image_extensions: config
                .ingestion
                .image_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            image_mode: config.image_output.mode,
        }
    }

    pub fn classify(&self, path: &Path) -> Result<MediaKind> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        if self.video_extensions.contains(&extension) {
            Ok(MediaKind::Video)
        } else if self.image_extensions.contains(&extension) {
            Ok(MediaKind::Image)
        } else {
            Err(Error::unsupported_format(extension))
        }
    }

    pub fn output_path_for(&self, input: &Path, kind: MediaKind) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());

        let extension = match (kind, self.image_mode) {
            (MediaKind::Image, ImageOutputMode::Still) => input
                .extension()
                .and_then(|e| e.to_str())
                .map(normalize_extension)
                .unwrap_or_else(|| "png".to_string()),
            _ => VIDEO_OUTPUT_EXTENSION.to_string(),
        };

        self.output_dir
            .join(format!("{}{}.{}", stem, self.output_suffix, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn router(mode: ImageOutputMode, suffix: &str) -> MediaRouter {
        let mut config = Config::default();
        config.app.output_dir = PathBuf::from("/out");
        config.image_output.mode = mode;
        config.ingestion.output_suffix = suffix.to_string();
        MediaRouter::new(&config)
    }

    #[test]
    fn test_classify_by_extension_case_insensitive() {
        let routes = router(ImageOutputMode::Video, "");
        assert_eq!(routes.classify(Path::new("a/clip.MOV")).unwrap(), MediaKind::Video);
        assert_eq!(routes.classify(Path::new("a/pic.JpEg")).unwrap(), MediaKind::Image);
        assert!(matches!(
            routes.classify(Path::new("a/notes.txt")),
            Err(Error::UnsupportedFormat { .. })
        ));
        assert!(routes.classify(Path::new("a/no_extension")).is_err());
    }

    #[test]
    fn test_output_naming() {
        let suffixed = router(ImageOutputMode::Video, "_16x9");
        assert_eq!(
            suffixed.output_path_for(Path::new("/in/clip.mov"), MediaKind::Video),
            PathBuf::from("/out/clip_16x9.mp4")
        );
        assert_eq!(
            suffixed.output_path_for(Path::new("/in/pic.JPG"), MediaKind::Image),
            PathBuf::from("/out/pic_16x9.mp4")
        );

        let stills = router(ImageOutputMode::Still, "");
        assert_eq!(
            stills.output_path_for(Path::new("/in/pic.JPG"), MediaKind::Image),
            PathBuf::from("/out/pic.jpg")
        );
    }
}
