use crate::background::BlurBackgroundBuilder;
use crate::config::RenderConfig;
use crate::normalize::composition::{BackgroundSource, CompositionSpec};
use std::path::Path;

const OUTPUT_LABEL: &str = "v";

/// Labelled chains joined into a single `-filter_complex` graph.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    chains: Vec<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self { chains: Vec::new() }
    }

    pub fn add_chain(&mut self, chain: String) {
        self.chains.push(chain);
    }

    pub fn build_ffmpeg_args(&self) -> Vec<String> {
        if self.chains.is_empty() {
            Vec::new()
        } else {
            vec![
                "-filter_complex".to_string(),
                self.chains.join(";"),
                "-map".to_string(),
                format!("[{}]", OUTPUT_LABEL),
            ]
        }
    }
}

impl std::fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.chains.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&self.chains.join(";"))
        }
    }
}

/// Turns a [`CompositionSpec`] into ffmpeg arguments using the fixed render preset.
pub struct RenderArgsBuilder<'a> {
    render: &'a RenderConfig,
}

impl<'a> RenderArgsBuilder<'a> {
    pub fn new(render: &'a RenderConfig) -> Self {
        Self { render }
    }

    /// Composite graph for a video source. ffmpeg applies rotation metadata while
    /// decoding, so `[0:v]` already arrives display-oriented and matches the
    /// geometry in `spec`.
    pub fn video_graph(&self, spec: &CompositionSpec, blur: Option<&BlurBackgroundBuilder>) -> FilterGraph {
        let mut graph = FilterGraph::new();
        let canvas = spec.canvas;
        let fg = spec.foreground_size;
        let offset = spec.foreground_offset;

        match (&spec.background, blur) {
            (BackgroundSource::BlurredDerivative { .. }, Some(builder)) => {
                graph.add_chain("[0:v]split=2[bgsrc][fgsrc]".to_string());
                graph.add_chain(builder.video_filter("bgsrc", "bg"));
                graph.add_chain(format!(
                    "[fgsrc]scale={}:{}:flags=lanczos,setsar=1[fg]",
                    fg.width, fg.height
                ));
            }
            _ => {
                graph.add_chain(format!(
                    "[1:v]scale={}:{}:flags=lanczos,setsar=1[bg]",
                    canvas.width, canvas.height
                ));
                graph.add_chain(format!(
                    "[0:v]scale={}:{}:flags=lanczos,setsar=1[fg]",
                    fg.width, fg.height
                ));
            }
        }

        graph.add_chain(format!(
            "[bg][fg]overlay={}:{}:shortest=1,fps={},format={}[{}]",
            offset.x, offset.y, self.render.fps, self.render.pixel_format, OUTPUT_LABEL
        ));
        graph
    }

    pub fn video_args(
        &self,
        spec: &CompositionSpec,
        blur: Option<&BlurBackgroundBuilder>,
        output: &Path,
    ) -> Vec<String> {
        let mut args = base_args();
        args.push("-i".to_string());
        args.push(spec.foreground.path.to_string_lossy().to_string());

        if let BackgroundSource::StaticImage(path) = &spec.background {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                self.render.fps.to_string(),
                "-i".to_string(),
                path.to_string_lossy().to_string(),
            ]);
        }

        args.extend(self.video_graph(spec, blur).build_ffmpeg_args());

        if spec.foreground.has_audio {
            args.extend([
                "-map".to_string(),
                "0:a:0?".to_string(),
                "-c:a".to_string(),
                self.render.audio_codec.clone(),
                "-b:a".to_string(),
                self.render.audio_bitrate.clone(),
            ]);
        } else {
            args.push("-an".to_string());
        }

        args.extend(self.encode_args(spec.duration_seconds));
        args.extend(output_args(output));
        args
    }

    /// Holds a single composed frame for `duration_seconds`.
    pub fn still_video_args(&self, frame: &Path, duration_seconds: f64, output: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            self.render.fps.to_string(),
            "-i".to_string(),
            frame.to_string_lossy().to_string(),
        ]);

        let mut graph = FilterGraph::new();
        graph.add_chain(format!(
            "[0:v]setsar=1,format={}[{}]",
            self.render.pixel_format, OUTPUT_LABEL
        ));
        args.extend(graph.build_ffmpeg_args());
        args.push("-an".to_string());
        args.extend(self.encode_args(duration_seconds));
        args.extend(output_args(output));
        args
    }

    fn encode_args(&self, duration_seconds: f64) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.render.video_codec.clone(),
            "-preset".to_string(),
            self.render.preset.clone(),
            "-crf".to_string(),
            self.render.crf.to_string(),
            "-pix_fmt".to_string(),
            self.render.pixel_format.clone(),
            "-r".to_string(),
            self.render.fps.to_string(),
            "-threads".to_string(),
            self.render.threads.to_string(),
            "-t".to_string(),
            format!("{:.3}", duration_seconds),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

fn base_args() -> Vec<String> {
    ["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Progress goes to stdout; the container is forced because scratch files carry no
/// media extension.
fn output_args(output: &Path) -> Vec<String> {
    vec![
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
