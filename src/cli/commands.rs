use crate::{
    cli::CliArgs,
    config::{BackgroundMode, Config},
    utils::Result,
};
use std::path::Path;

/// Runs informational commands. Returns `true` when one ran and the process should exit.
pub async fn handle_commands(args: &CliArgs, config: &Config) -> Result<bool> {
    if args.validate_config {
        validate_config(&args.config, config)?;
        return Ok(true);
    }

    if args.show_config {
        show_config(config)?;
        return Ok(true);
    }

    Ok(false)
}

fn validate_config(path: &Path, config: &Config) -> Result<()> {
    match config.validate() {
        Ok(()) => {
            if path.exists() {
                println!("✓ Configuration file is valid: {}", path.display());
            } else {
                println!("✓ Configuration is valid (using discovered/default config)");
            }
            println!();
            println!("Configuration Summary:");
            println!("{:-<40}", "");
            println!("Inbox:       {}", config.app.input_dir.display());
            println!("Output:      {}", config.app.output_dir.display());
            println!(
                "Canvas:      {}x{}",
                config.canvas.width, config.canvas.height
            );
            let background = match (&config.background.mode, &config.background.path) {
                (BackgroundMode::Static, Some(path)) => path.display().to_string(),
                _ => format!("radius {}", config.background.blur_radius),
            };
            println!(
                "Background:  {} ({})",
                config.background.mode.as_str(),
                background
            );
            println!("Acceptance:  {}", config.acceptance.as_str());
            println!("Concurrency: {}", config.ingestion.max_concurrent_jobs);
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration validation failed: {}", e);
            println!();
            println!("Common issues:");
            println!("  - Check YAML syntax and indentation");
            println!("  - The canvas must be 16:9 with even dimensions");
            println!("  - Static backgrounds need background.path");
            println!("  - Input and output directories must differ");
            Err(e)
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
