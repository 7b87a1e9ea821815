//! Log lines for job lifecycle events, shared by the controller and the CLI

use crate::media::MediaKind;
use crate::utils::filesystem::format_file_size;
use std::path::Path;
use std::time::Duration;

fn name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn log_job_start(input: &Path, kind: MediaKind) {
    tracing::info!("Processing {} ({})", name(input), kind);
}

pub fn log_job_done(input: &Path, output: &Path, bytes: u64, elapsed: Duration) {
    tracing::info!(
        "✓ {} -> {} ({} in {:.1}s)",
        name(input),
        output.display(),
        format_file_size(bytes),
        elapsed.as_secs_f64()
    );
}

pub fn log_job_skipped(input: &Path, reason: &str) {
    tracing::info!("↷ {} skipped: {}", name(input), reason);
}

pub fn log_job_failed(input: &Path, cause: &str) {
    tracing::error!("✗ {} failed: {}", name(input), cause);
}

pub fn log_job_cancelled(input: &Path) {
    tracing::warn!("✗ {} abandoned at shutdown", name(input));
}
