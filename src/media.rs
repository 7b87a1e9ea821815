use crate::geometry::Size;
use crate::utils::ffmpeg::VideoMetadata;
use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A probed source file. Built once per job and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Display-oriented frame size.
    pub width: u32,
    pub height: u32,
    /// Zero for images.
    pub duration_seconds: f64,
    /// Clockwise degrees; always zero for images.
    pub rotation_degrees: i32,
    pub has_audio: bool,
}

impl MediaAsset {
    pub fn image<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind: MediaKind::Image,
            width,
            height,
            duration_seconds: 0.0,
            rotation_degrees: 0,
            has_audio: false,
        }
    }

    pub fn video<P: AsRef<Path>>(path: P, metadata: &VideoMetadata) -> Self {
        let display = metadata.display_size();
        Self {
            path: path.as_ref().to_path_buf(),
            kind: MediaKind::Video,
            width: display.width,
            height: display.height,
            duration_seconds: metadata.duration,
            rotation_degrees: metadata.rotation,
            has_audio: metadata.has_audio,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Rejects sources that cannot produce a single frame of output.
    pub fn ensure_renderable(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::degenerate_source(format!(
                "{} has zero-size frames ({}x{})",
                self.file_name(),
                self.width,
                self.height
            )));
        }
        if self.kind == MediaKind::Video && !(self.duration_seconds > 0.0) {
            return Err(Error::degenerate_source(format!(
                "{} has no duration",
                self.file_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(width: u32, height: u32, duration: f64, rotation: i32) -> VideoMetadata {
        VideoMetadata {
            width,
            height,
            duration,
            rotation,
            has_audio: true,
        }
    }

    #[test]
    fn test_video_asset_uses_display_orientation() {
        let asset = MediaAsset::video("in/clip.mov", &metadata(1920, 1080, 4.0, 90));
        assert_eq!(asset.size(), Size::new(1080, 1920));
        assert_eq!(asset.rotation_degrees, 90);
        assert_eq!(asset.file_name(), "clip.mov");
    }

    #[test]
    fn test_degenerate_sources_rejected() {
        let zero_duration = MediaAsset::video("clip.mp4", &metadata(1080, 1920, 0.0, 0));
        assert!(matches!(
            zero_duration.ensure_renderable(),
            Err(Error::DegenerateSource { .. })
        ));

        let nan_duration = MediaAsset::video("clip.mp4", &metadata(1080, 1920, f64::NAN, 0));
        assert!(nan_duration.ensure_renderable().is_err());

        let empty_frame = MediaAsset::image("still.png", 0, 10);
        assert!(empty_frame.ensure_renderable().is_err());

        assert!(MediaAsset::image("still.png", 10, 10).ensure_renderable().is_ok());
    }
}
