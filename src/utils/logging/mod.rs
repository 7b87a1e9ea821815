//! Console logging: a tracing subscriber with a compact hierarchical formatter,
//! plus helpers for job lifecycle messages.

mod formatter;
mod helpers;
mod text_utils;

pub use helpers::{log_job_cancelled, log_job_done, log_job_failed, log_job_skipped, log_job_start};

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use formatter::CleanFormatter;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the global subscriber. `RUST_LOG` still overrides `level`.
///
/// ```no_run
/// use aspect_normalizer::utils::logging::setup_logging;
///
/// setup_logging("info", false, true).expect("Failed to setup logging");
/// ```
pub fn setup_logging(
    level: &str,
    show_timestamps: bool,
    colored: bool,
) -> crate::utils::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(false)
        .with_writer(std::io::stderr)
        .event_format(CleanFormatter::new(show_timestamps, colored));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| crate::utils::Error::configuration(format!("Logging already initialised: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }
}
