use crate::background::BackgroundPolicy;
use crate::config::Config;
use crate::geometry::Size;
use crate::ingest::router::MediaRouter;
use crate::ingest::settle::SettlePolicy;
use crate::ingest::watcher::Arrival;
use crate::media::MediaKind;
use crate::normalize::{ImageNormalizer, NormalizeOutcome, VideoNormalizer};
use crate::utils::logging::{
    log_job_cancelled, log_job_done, log_job_failed, log_job_skipped, log_job_start,
};
use crate::utils::{Error, FfmpegWrapper, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of one inbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Arrived,
    Settling,
    Classified,
    Dispatched,
    Done,
    Skipped,
    Failed,
}

/// One unit of work handed to a dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub kind: MediaKind,
}

/// Terminal result of handling one arrival.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done { output: PathBuf, bytes: u64 },
    Skipped { reason: String },
    Failed { cause: String },
    /// Shutdown interrupted the job; nothing was committed.
    Cancelled,
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            Self::Done { .. } => JobState::Done,
            Self::Skipped { .. } => JobState::Skipped,
            Self::Failed { .. } | Self::Cancelled => JobState::Failed,
        }
    }
}

/// Runs a job to completion. The controller only sees this seam, so tests can count
/// invocations without spawning ffmpeg.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: &Job, cancel: &CancellationToken) -> Result<NormalizeOutcome>;
}

/// Production dispatcher: images and videos go to their normalizers.
pub struct Pipeline {
    background: Arc<BackgroundPolicy>,
    image: ImageNormalizer,
    video: VideoNormalizer,
}

impl Pipeline {
    pub fn new(config: &Config, background: Arc<BackgroundPolicy>, ffmpeg: FfmpegWrapper) -> Self {
        Self {
            image: ImageNormalizer::new(config, Arc::clone(&background), ffmpeg.clone()),
            video: VideoNormalizer::new(config, Arc::clone(&background), ffmpeg),
            background,
        }
    }

    /// Startup path. The background is loaded before the external tools are checked
    /// so a bad background path is the error reported even when ffmpeg is missing too.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let canvas = Size::new(config.canvas.width, config.canvas.height);
        let background = Arc::new(BackgroundPolicy::from_config(&config.background, canvas)?);

        let ffmpeg = FfmpegWrapper::new(
            config.tools.ffmpeg.clone(),
            config.tools.ffprobe.clone(),
            config.render.timeout_secs,
        );
        ffmpeg.check_availability().await?;

        Ok(Self::new(config, background, ffmpeg))
    }

    pub fn background(&self) -> &BackgroundPolicy {
        &self.background
    }
}

#[async_trait]
impl JobDispatcher for Pipeline {
    async fn dispatch(&self, job: &Job, cancel: &CancellationToken) -> Result<NormalizeOutcome> {
        match job.kind {
            MediaKind::Image => {
                self.image
                    .normalize(&job.input_path, &job.output_path, cancel)
                    .await
            }
            MediaKind::Video => {
                self.video
                    .normalize(&job.input_path, &job.output_path, cancel)
                    .await
            }
        }
    }
}

/// Tallies of terminal job states for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl IngestionSummary {
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Done { .. } => self.done += 1,
            JobOutcome::Skipped { .. } => self.skipped += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.skipped + self.failed + self.cancelled
    }
}

impl fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} done, {} skipped, {} failed, {} cancelled",
            self.done, self.skipped, self.failed, self.cancelled
        )
    }
}

/// Turns inbox arrivals into at most one render per output path.
///
/// Two tokens govern shutdown: `intake` stops settling and queued jobs immediately,
/// `work` cancels renders already in flight once the drain window has passed.
#[derive(Clone)]
pub struct IngestionController {
    dispatcher: Arc<dyn JobDispatcher>,
    router: Arc<MediaRouter>,
    settle: SettlePolicy,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    drain_timeout: Duration,
}

impl IngestionController {
    pub fn new(config: &Config, dispatcher: Arc<dyn JobDispatcher>) -> Self {
        Self {
            dispatcher,
            router: Arc::new(MediaRouter::new(config)),
            settle: SettlePolicy::from_config(&config.ingestion.settle),
            permits: Arc::new(Semaphore::new(config.ingestion.max_concurrent_jobs.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            drain_timeout: Duration::from_secs(config.shutdown.drain_timeout_secs),
        }
    }

    /// Walks one arrival through settle, classification, the idempotency check and
    /// dispatch. Every exit is logged; nothing here returns an error to the caller.
    pub async fn handle_arrival(
        &self,
        path: &Path,
        intake: &CancellationToken,
        work: &CancellationToken,
    ) -> JobOutcome {
        let outcome = self.process(path, intake, work).await;
        match &outcome {
            JobOutcome::Done { .. } => {}
            JobOutcome::Skipped { reason } => log_job_skipped(path, reason),
            JobOutcome::Failed { cause } => log_job_failed(path, cause),
            JobOutcome::Cancelled => log_job_cancelled(path),
        }
        outcome
    }

    async fn process(
        &self,
        path: &Path,
        intake: &CancellationToken,
        work: &CancellationToken,
    ) -> JobOutcome {
        let mut state = JobState::Arrived;
        debug!("{}: {:?}", path.display(), state);

        if !path.is_file() {
            return JobOutcome::Skipped {
                reason: "not a regular file".to_string(),
            };
        }

        // Extension routing needs no file contents, so unsupported files skip the settle wait.
        let kind = match self.router.classify(path) {
            Ok(kind) => kind,
            Err(Error::UnsupportedFormat { extension }) => {
                return JobOutcome::Skipped {
                    reason: format!("unsupported extension '{}'", extension),
                };
            }
            Err(e) => return failed(e),
        };
        let job = Job {
            input_path: path.to_path_buf(),
            output_path: self.router.output_path_for(path, kind),
            kind,
        };
        if job.output_path.exists() {
            return already_done(&job);
        }

        state = JobState::Settling;
        debug!("{}: {:?}", path.display(), state);
        if let Err(e) = self.settle.wait(path, intake).await {
            return failed(e);
        }

        state = JobState::Classified;
        debug!("{}: {:?} as {}", path.display(), state, kind);

        let _permit = tokio::select! {
            _ = intake.cancelled() => return JobOutcome::Cancelled,
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return JobOutcome::Cancelled,
            },
        };

        if !self.in_flight.lock().await.insert(job.output_path.clone()) {
            return JobOutcome::Skipped {
                reason: format!("{} is already being rendered", job.output_path.display()),
            };
        }
        let outcome = self.dispatch(&job, work).await;
        self.in_flight.lock().await.remove(&job.output_path);
        outcome
    }

    async fn dispatch(&self, job: &Job, work: &CancellationToken) -> JobOutcome {
        // Re-checked under the permit: an earlier job may have produced it meanwhile.
        if job.output_path.exists() {
            return already_done(job);
        }

        debug!("{}: {:?}", job.input_path.display(), JobState::Dispatched);
        log_job_start(&job.input_path, job.kind);
        let started = Instant::now();

        match self.dispatcher.dispatch(job, work).await {
            Ok(NormalizeOutcome::Rendered { output, bytes }) => {
                log_job_done(&job.input_path, &output, bytes, started.elapsed());
                JobOutcome::Done { output, bytes }
            }
            Ok(NormalizeOutcome::Skipped { reason }) => JobOutcome::Skipped { reason },
            Err(e) => failed(e),
        }
    }

    /// Consumes arrivals until the channel closes or `shutdown` fires.
    ///
    /// On a closed channel every queued job runs to completion. On shutdown, new
    /// arrivals are refused, jobs still settling or queued are dropped, and renders in
    /// flight get the drain window before being cancelled.
    pub async fn run(
        &self,
        mut arrivals: mpsc::Receiver<Arrival>,
        shutdown: CancellationToken,
    ) -> IngestionSummary {
        let work = CancellationToken::new();
        let mut tasks: JoinSet<JobOutcome> = JoinSet::new();
        let mut summary = IngestionSummary::default();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(joined) = tasks.join_next() => record(&mut summary, joined),
                arrival = arrivals.recv() => match arrival {
                    Some(arrival) => {
                        let controller = self.clone();
                        let intake = shutdown.clone();
                        let work = work.clone();
                        tasks.spawn(async move {
                            controller.handle_arrival(&arrival.path, &intake, &work).await
                        });
                    }
                    None => {
                        debug!("Arrival stream closed, waiting for {} job(s)", tasks.len());
                        loop {
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                joined = tasks.join_next() => match joined {
                                    Some(joined) => record(&mut summary, joined),
                                    None => return summary,
                                },
                            }
                        }
                        break;
                    }
                },
            }
        }

        arrivals.close();
        self.drain(tasks, work, &mut summary).await;
        summary
    }

    async fn drain(
        &self,
        mut tasks: JoinSet<JobOutcome>,
        work: CancellationToken,
        summary: &mut IngestionSummary,
    ) {
        if tasks.is_empty() {
            return;
        }

        info!(
            "Shutting down: waiting up to {}s for {} job(s)",
            self.drain_timeout.as_secs(),
            tasks.len()
        );

        let deadline = tokio::time::sleep(self.drain_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => record(summary, joined),
                    None => return,
                },
                _ = &mut deadline, if !work.is_cancelled() => {
                    warn!("Drain window elapsed, cancelling {} job(s)", tasks.len());
                    work.cancel();
                }
            }
        }
    }
}

fn already_done(job: &Job) -> JobOutcome {
    JobOutcome::Skipped {
        reason: format!("{} already exists", job.output_path.display()),
    }
}

fn failed(error: Error) -> JobOutcome {
    match error {
        Error::Cancelled => JobOutcome::Cancelled,
        other => JobOutcome::Failed {
            cause: other.to_string(),
        },
    }
}

fn record(
    summary: &mut IngestionSummary,
    joined: std::result::Result<JobOutcome, tokio::task::JoinError>,
) {
    match joined {
        Ok(outcome) => summary.record(&outcome),
        Err(e) => {
            tracing::error!("Job task panicked: {}", e);
            summary.failed += 1;
        }
    }
}
