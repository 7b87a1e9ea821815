pub mod error;
pub mod ffmpeg;
pub mod filesystem;
pub mod logging;
pub mod tool_runner;

pub use error::{Error, Result};
pub use ffmpeg::FfmpegWrapper;
pub use filesystem::{ensure_dir, list_directory_files, TempOutput};
pub use logging::setup_logging;
pub use tool_runner::ToolRunner;
