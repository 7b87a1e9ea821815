use crate::geometry::{oriented_size, Size};
use crate::utils::{Error, Result, ToolRunner};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// What the normalizers need to know about a source video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    /// Coded frame size, before rotation metadata is applied.
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    /// Clockwise display rotation in degrees, normalized to 0..360.
    pub rotation: i32,
    pub has_audio: bool,
}

impl VideoMetadata {
    /// Frame size as displayed, after the rotation transform.
    pub fn display_size(&self) -> Size {
        oriented_size(Size::new(self.width, self.height), self.rotation)
    }
}

#[derive(Debug, Clone)]
pub struct FfmpegWrapper {
    ffprobe_path: String,
    runner: ToolRunner,
}

impl FfmpegWrapper {
    pub fn new(ffmpeg_path: String, ffprobe_path: String, render_timeout_secs: u64) -> Self {
        Self {
            ffprobe_path,
            runner: ToolRunner::new(ffmpeg_path, render_timeout_secs),
        }
    }

    pub async fn check_availability(&self) -> Result<()> {
        self.runner.check_availability("-version").await?;
        ToolRunner::new(self.ffprobe_path.clone(), 10)
            .check_availability("-version")
            .await
    }

    pub async fn probe<P: AsRef<Path>>(&self, input_path: P) -> Result<VideoMetadata> {
        let input_path = input_path.as_ref().to_string_lossy().to_string();

        let mut command = TokioCommand::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                input_path.as_str(),
            ])
            .kill_on_drop(true);

        let output = tokio::time::timeout(PROBE_TIMEOUT, command.output())
            .await
            .map_err(|_| Error::probe_failed(format!("ffprobe timed out on {}", input_path)))?
            .map_err(|e| Error::probe_failed(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(Error::probe_failed(format!(
                "ffprobe failed: {}",
                error_msg.trim()
            )));
        }

        let probe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::probe_failed(format!("Failed to parse ffprobe output: {}", e)))?;

        parse_video_metadata(&probe_data)
    }

    /// Runs ffmpeg with `args`, forwarding each `-progress` line to `on_line`.
    pub async fn render<F>(
        &self,
        args: &[String],
        cancel: &CancellationToken,
        on_line: F,
    ) -> Result<()>
    where
        F: FnMut(&str) + Send,
    {
        self.runner.run(args, cancel, on_line).await
    }
}

pub fn parse_video_metadata(data: &serde_json::Value) -> Result<VideoMetadata> {
    let streams = data["streams"]
        .as_array()
        .ok_or_else(|| Error::probe_failed("No streams found in ffprobe output"))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| Error::probe_failed("No video stream found"))?;

    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| Error::probe_failed("Video width not found"))? as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| Error::probe_failed("Video height not found"))? as u32;

    // Container duration first, stream duration as a fallback; missing means zero.
    let duration = data["format"]["duration"]
        .as_str()
        .or_else(|| video_stream["duration"].as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let has_audio = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("audio"));

    let rotation = parse_rotation(video_stream);
    if rotation != 0 {
        debug!("Source carries {} degree rotation", rotation);
    }

    Ok(VideoMetadata {
        width,
        height,
        duration,
        rotation,
        has_audio,
    })
}

/// Reads clockwise display rotation from either the legacy `rotate` tag or the
/// display-matrix side data (which ffprobe reports counter-clockwise).
fn parse_rotation(video_stream: &serde_json::Value) -> i32 {
    let from_tag = video_stream["tags"]["rotate"]
        .as_str()
        .and_then(|r| r.trim().parse::<i32>().ok());

    let from_side_data = video_stream["side_data_list"].as_array().and_then(|list| {
        list.iter()
            .find_map(|entry| entry["rotation"].as_f64())
            .map(|r| -(r.round() as i32))
    });

    from_tag.or(from_side_data).unwrap_or(0).rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_portrait_phone_clip() {
        let data = json!({
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "avg_frame_rate": "30/1",
                    "side_data_list": [
                        { "side_data_type": "Display Matrix", "rotation": -90 }
                    ]
                },
                { "codec_type": "audio", "codec_name": "aac" }
            ],
            "format": { "duration": "12.480000" }
        });

        let metadata = parse_video_metadata(&data).unwrap();
        assert_eq!(metadata.rotation, 90);
        assert!(metadata.has_audio);
        assert!((metadata.duration - 12.48).abs() < 1e-9);
        assert_eq!(metadata.display_size(), Size::new(1080, 1920));
    }

    #[test]
    fn test_parse_rotate_tag_and_missing_duration() {
        let data = json!({
            "streams": [
                {
                    "codec_type": "video",
                    "width": 640,
                    "height": 480,
                    "r_frame_rate": "25/1",
                    "tags": { "rotate": "270" }
                }
            ],
            "format": {}
        });

        let metadata = parse_video_metadata(&data).unwrap();
        assert_eq!(metadata.rotation, 270);
        assert!(!metadata.has_audio);
        assert_eq!(metadata.duration, 0.0);
        assert_eq!(metadata.display_size(), Size::new(480, 640));
    }

    #[test]
    fn test_parse_rejects_audio_only() {
        let data = json!({
            "streams": [ { "codec_type": "audio", "codec_name": "mp3" } ],
            "format": { "duration": "3.0" }
        });
        assert!(matches!(
            parse_video_metadata(&data),
            Err(Error::ProbeFailed { .. })
        ));
    }
}
