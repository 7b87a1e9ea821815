//! Inbox ingestion: polling for arrivals, waiting for them to settle, routing by
//! extension and dispatching at most one render per output path.

pub mod controller;
pub mod router;
pub mod settle;
pub mod watcher;

pub use controller::{
    IngestionController, IngestionSummary, Job, JobDispatcher, JobOutcome, JobState, Pipeline,
};
pub use router::MediaRouter;
pub use settle::SettlePolicy;
pub use watcher::{Arrival, ArrivalKind, DirectoryWatcher};
