use crate::utils::filesystem::list_directory_files;
use crate::utils::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKind {
    Created,
}

/// A file that showed up in the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub path: PathBuf,
    pub kind: ArrivalKind,
}

impl Arrival {
    pub fn created(path: PathBuf) -> Self {
        Self {
            path,
            kind: ArrivalKind::Created,
        }
    }
}

/// Polls one directory (non-recursively) and reports files that were not there on
/// the previous pass. Files that vanish and come back are reported again.
#[derive(Debug, Clone)]
pub struct DirectoryWatcher {
    dir: PathBuf,
    poll_interval: Duration,
    emit_existing: bool,
}

impl DirectoryWatcher {
    pub fn new<P: AsRef<Path>>(dir: P, poll_interval: Duration, emit_existing: bool) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            poll_interval,
            emit_existing,
        }
    }

    /// Current candidate files, skipping hidden ones (partial copies, our own scratch files).
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        Ok(list_directory_files(&self.dir)?
            .into_iter()
            .filter(|path| !is_hidden(path))
            .collect())
    }

    /// Sends arrivals until `cancel` fires or the receiver goes away.
    pub async fn run(self, tx: mpsc::Sender<Arrival>, cancel: CancellationToken) -> Result<()> {
        let initial = self.scan()?;
        let mut seen: HashSet<PathBuf> = HashSet::new();

        if self.emit_existing {
            info!("Found {} existing file(s) in {}", initial.len(), self.dir.display());
            for path in &initial {
                if tx.send(Arrival::created(path.clone())).await.is_err() {
                    return Ok(());
                }
            }
        }
        seen.extend(initial);

        info!("Watching {} (every {}ms)", self.dir.display(), self.poll_interval.as_millis());

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Watcher for {} stopped", self.dir.display());
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let current = match self.scan() {
                Ok(files) => files,
                Err(e) => {
                    warn!("Failed to list {}: {}", self.dir.display(), e);
                    continue;
                }
            };

            for path in &current {
                if seen.contains(path) {
                    continue;
                }
                debug!("New file: {}", path.display());
                if tx.send(Arrival::created(path.clone())).await.is_err() {
                    return Ok(());
                }
            }

            seen = current.into_iter().collect();
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
