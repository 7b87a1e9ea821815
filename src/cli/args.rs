use crate::config::{BackgroundMode, Config};
use crate::utils::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(name = "aspect-normalizer")]
#[command(about = "Watches an inbox and normalizes arriving images and videos to 16:9")]
#[command(long_about = "
Watches an input directory and turns every arriving image or video into a 16:9
output, compositing the original over a static or blurred background. Outputs
that already exist are never rendered twice.

EXAMPLES:
  # Watch ./input, write to ./output, blurred backgrounds
  aspect-normalizer

  # Custom folders with a fixed background image
  aspect-normalizer -i ~/Inbox -o ~/Outbox --background studio.jpg

  # Convert what is already there and exit
  aspect-normalizer --once --blur 20
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(long, default_value = "config.yaml", value_name = "FILE")]
    pub config: PathBuf,

    /// Inbox directory to watch (overrides app.input_dir)
    #[arg(short, long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Output directory (overrides app.output_dir)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Use a static 16:9 background image instead of a blurred one
    #[arg(long, value_name = "FILE", conflicts_with = "blur")]
    pub background: Option<PathBuf>,

    /// Use a blurred background, optionally with a custom radius
    #[arg(long, value_name = "RADIUS", num_args = 0..=1, default_missing_value = "30")]
    pub blur: Option<f32>,

    /// Maximum number of renders running at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Process files currently in the inbox, then exit
    #[arg(long)]
    pub once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validate configuration file and exit
    #[arg(long)]
    pub validate_config: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    pub show_config: bool,
}

impl CliArgs {
    pub fn get_log_level<'a>(&self, config_level: &'a str) -> &'a str {
        if self.debug || self.verbose {
            "debug"
        } else {
            config_level
        }
    }

    pub fn should_use_color(&self) -> bool {
        !self.no_color
    }

    /// Folds command-line overrides into `config`. The caller validates afterwards.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(input) = &self.input {
            config.app.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.app.output_dir = output.clone();
        }

        if let Some(path) = &self.background {
            config.background.mode = BackgroundMode::Static;
            config.background.path = Some(path.clone());
        } else if let Some(radius) = self.blur {
            if !(radius > 0.0) {
                return Err(Error::configuration(format!(
                    "--blur radius must be greater than 0, got {}",
                    radius
                )));
            }
            config.background.mode = BackgroundMode::Blurred;
            config.background.blur_radius = radius;
        }

        if let Some(concurrency) = self.concurrency {
            config.ingestion.max_concurrent_jobs = concurrency;
        }
        if self.once {
            config.ingestion.scan_existing = true;
        }
        Ok(())
    }
}
