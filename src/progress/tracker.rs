use crate::config::ProgressConfig;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::debug;

static OUT_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^out_time=(\d+):(\d{2}):(\d{2})(?:\.(\d+))?$").unwrap());

static FRAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^frame=\s*(\d+)$").unwrap());

static SPEED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^speed=\s*([0-9.]+)x$").unwrap());

/// Render state accumulated from ffmpeg `-progress` key=value lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMetrics {
    pub current_frame: u64,
    pub current_time: f64,
    pub total_duration: f64,
    pub speed: Option<f32>,
    pub finished: bool,
    pub progress_percentage: f32,
}

impl ProgressMetrics {
    pub fn new(total_duration: f64) -> Self {
        Self {
            current_frame: 0,
            current_time: 0.0,
            total_duration,
            speed: None,
            finished: false,
            progress_percentage: 0.0,
        }
    }

    pub fn update_from_progress_line(&mut self, line: &str) -> bool {
        let line = line.trim();

        if let Some(captures) = FRAME_REGEX.captures(line) {
            if let Ok(frame) = captures[1].parse::<u64>() {
                self.current_frame = frame;
                return true;
            }
        }

        if let Some(captures) = OUT_TIME_REGEX.captures(line) {
            let hours: f64 = captures[1].parse().unwrap_or(0.0);
            let minutes: f64 = captures[2].parse().unwrap_or(0.0);
            let seconds: f64 = captures[3].parse().unwrap_or(0.0);
            let fraction: f64 = captures
                .get(4)
                .and_then(|m| format!("0.{}", m.as_str()).parse().ok())
                .unwrap_or(0.0);

            self.current_time = hours * 3600.0 + minutes * 60.0 + seconds + fraction;
            self.progress_percentage = if self.total_duration > 0.0 {
                ((self.current_time / self.total_duration) * 100.0).clamp(0.0, 100.0) as f32
            } else {
                0.0
            };
            return true;
        }

        if let Some(captures) = SPEED_REGEX.captures(line) {
            self.speed = captures[1].parse().ok();
            return true;
        }

        if line == "progress=end" {
            self.finished = true;
            self.progress_percentage = 100.0;
            return true;
        }

        false
    }
}

/// Progress bar plus throttled debug logging for one render.
pub struct RenderProgress {
    bar: ProgressBar,
    metrics: ProgressMetrics,
    label: String,
    start_time: Instant,
    last_update: Instant,
    update_interval: Duration,
}

impl RenderProgress {
    pub fn new(label: &str, total_duration: f64, config: &ProgressConfig) -> Self {
        let bar = if config.show_bar {
            ProgressBar::new(10000) // 0.01% precision
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:>3}% | {msg}",
        ) {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        bar.set_prefix(label.to_string());

        let now = Instant::now();
        Self {
            bar,
            metrics: ProgressMetrics::new(total_duration),
            label: label.to_string(),
            start_time: now,
            last_update: now,
            update_interval: Duration::from_millis(config.update_interval_ms),
        }
    }

    pub fn update(&mut self, line: &str) {
        if !self.metrics.update_from_progress_line(line) {
            return;
        }

        let now = Instant::now();
        if now.duration_since(self.last_update) < self.update_interval && !self.metrics.finished {
            return;
        }
        self.last_update = now;

        self.bar
            .set_position((self.metrics.progress_percentage * 100.0) as u64);
        let speed = self
            .metrics
            .speed
            .map(|s| format!("{:.1}x", s))
            .unwrap_or_else(|| "-".to_string());
        self.bar.set_message(format!(
            "frame {} | {}",
            self.metrics.current_frame, speed
        ));

        debug!(
            "Rendering {}: {:.1}% (frame {}, {})",
            self.label, self.metrics.progress_percentage, self.metrics.current_frame, speed
        );
    }

    pub fn metrics(&self) -> &ProgressMetrics {
        &self.metrics
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        self.bar.set_position(10000);
        self.bar.finish_and_clear();
        debug!("Render of {} took {:.1}s", self.label, elapsed.as_secs_f32());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_parsing() {
        let mut metrics = ProgressMetrics::new(20.0);

        assert!(metrics.update_from_progress_line("frame=150"));
        assert!(metrics.update_from_progress_line("out_time=00:00:05.000000"));
        assert!(metrics.update_from_progress_line("speed=1.25x"));
        assert!(!metrics.update_from_progress_line("bitrate=N/A"));

        assert_eq!(metrics.current_frame, 150);
        assert_eq!(metrics.current_time, 5.0);
        assert_eq!(metrics.speed, Some(1.25));
        assert_eq!(metrics.progress_percentage, 25.0);
        assert!(!metrics.finished);
    }

    #[test]
    fn test_progress_end_marks_complete() {
        let mut metrics = ProgressMetrics::new(0.0);
        assert!(metrics.update_from_progress_line("out_time=00:00:01.5"));
        assert_eq!(metrics.progress_percentage, 0.0);
        assert!(metrics.update_from_progress_line("progress=end"));
        assert!(metrics.finished);
        assert_eq!(metrics.progress_percentage, 100.0);
    }

    #[test]
    fn test_render_progress_hidden_bar_updates_metrics() {
        let config = ProgressConfig {
            show_bar: false,
            update_interval_ms: 0,
        };
        let mut progress = RenderProgress::new("clip.mp4", 10.0, &config);
        progress.update("out_time=00:00:10.000000");
        assert_eq!(progress.metrics().progress_percentage, 100.0);
        progress.finish();
    }
}
