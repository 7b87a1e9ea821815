use crate::config::SettleConfig;
use crate::utils::{Error, Result};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Consecutive unchanged samples after which an empty file is handed on as-is.
const EMPTY_FILE_GRACE_SAMPLES: u32 = 3;

/// How long to wait before touching a freshly arrived file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlePolicy {
    FixedDelay(Duration),
    /// Size and mtime must match across two consecutive samples. A file that stays
    /// empty is released after a short grace so it fails downstream instead of
    /// waiting out `max_wait`.
    StableSize {
        sample_interval: Duration,
        max_wait: Duration,
    },
}

impl SettlePolicy {
    pub fn from_config(config: &SettleConfig) -> Self {
        match *config {
            SettleConfig::FixedDelay { delay_ms } => {
                Self::FixedDelay(Duration::from_millis(delay_ms))
            }
            SettleConfig::StableSize {
                sample_interval_ms,
                max_wait_secs,
            } => Self::StableSize {
                sample_interval: Duration::from_millis(sample_interval_ms),
                max_wait: Duration::from_secs(max_wait_secs),
            },
        }
    }

    pub async fn wait(&self, path: &Path, cancel: &CancellationToken) -> Result<()> {
        match *self {
            Self::FixedDelay(delay) => sleep_or_cancel(delay, cancel).await,
            Self::StableSize {
                sample_interval,
                max_wait,
            } => wait_until_stable(path, sample_interval, max_wait, cancel).await,
        }
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

async fn snapshot(path: &Path) -> Result<(u64, Option<SystemTime>)> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok((metadata.len(), metadata.modified().ok()))
}

async fn wait_until_stable(
    path: &Path,
    sample_interval: Duration,
    max_wait: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let started = Instant::now();
    let mut previous = snapshot(path).await?;
    let mut empty_streak = 0;

    loop {
        sleep_or_cancel(sample_interval, cancel).await?;
        let current = snapshot(path).await?;

        if current == previous {
            if current.0 > 0 {
                debug!(
                    "{} settled at {} bytes after {:.1}s",
                    path.display(),
                    current.0,
                    started.elapsed().as_secs_f32()
                );
                return Ok(());
            }
            empty_streak += 1;
            if empty_streak >= EMPTY_FILE_GRACE_SAMPLES {
                warn!("{} is still empty, processing anyway", path.display());
                return Ok(());
            }
        } else {
            empty_streak = 0;
        }

        if started.elapsed() >= max_wait {
            warn!(
                "{} still changing after {}s, processing anyway",
                path.display(),
                max_wait.as_secs()
            );
            return Ok(());
        }

        previous = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_policy_from_config() {
        let policy = SettlePolicy::from_config(&SettleConfig::FixedDelay { delay_ms: 2500 });
        assert_eq!(policy, SettlePolicy::FixedDelay(Duration::from_millis(2500)));

        let policy = SettlePolicy::from_config(&SettleConfig::default());
        assert_eq!(
            policy,
            SettlePolicy::StableSize {
                sample_interval: Duration::from_secs(1),
                max_wait: Duration::from_secs(300),
            }
        );
    }

    #[tokio::test]
    async fn test_stable_file_settles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![1u8; 2048]).unwrap();

        let policy = SettlePolicy::StableSize {
            sample_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        };
        policy.wait(&path, &CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let policy = SettlePolicy::StableSize {
            sample_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        };
        let err = policy
            .wait(&dir.path().join("gone.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_growing_file_is_not_settled_until_writes_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        std::fs::write(&path, vec![1u8; 16]).unwrap();

        let writing = Arc::new(AtomicBool::new(true));
        let writer = {
            let (path, writing) = (path.clone(), writing.clone());
            tokio::spawn(async move {
                for _ in 0..40 {
                    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
                    file.write_all(&[2u8; 64]).unwrap();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                writing.store(false, Ordering::SeqCst);
            })
        };

        let policy = SettlePolicy::StableSize {
            sample_interval: Duration::from_millis(50),
            max_wait: Duration::from_secs(10),
        };
        policy.wait(&path, &CancellationToken::new()).await.unwrap();

        assert!(!writing.load(Ordering::SeqCst));
        writer.await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16 + 40 * 64);
    }

    #[tokio::test]
    async fn test_empty_file_released_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let policy = SettlePolicy::StableSize {
            sample_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(300),
        };
        let started = Instant::now();
        tokio::time::timeout(
            Duration::from_secs(5),
            policy.wait(&path, &CancellationToken::new()),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stable_size_wait_is_cancellable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mov");
        std::fs::write(&path, b"").unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let policy = SettlePolicy::StableSize {
            sample_interval: Duration::from_secs(60),
            max_wait: Duration::from_secs(300),
        };
        let err = policy.wait(&path, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = SettlePolicy::FixedDelay(Duration::from_secs(60));
        let err = policy.wait(Path::new("whatever"), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
