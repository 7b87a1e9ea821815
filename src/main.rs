use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use aspect_normalizer::{
    cli::{handle_commands, CliArgs},
    config::Config,
    ingest::{Arrival, DirectoryWatcher, IngestionController, Pipeline},
    utils::{ensure_dir, setup_logging, Error, Result},
};

const ARRIVAL_QUEUE_DEPTH: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = Config::load_with_fallback(&args.config)?;
    args.apply_overrides(&mut config)?;

    setup_logging(
        args.get_log_level(&config.logging.level),
        config.logging.show_timestamps,
        config.logging.colored_output && args.should_use_color(),
    )?;

    if handle_commands(&args, &config).await? {
        return Ok(());
    }

    config.validate()?;
    run(&args, &config).await
}

async fn run(args: &CliArgs, config: &Config) -> Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(config).await?);

    ensure_dir(&config.app.input_dir)?;
    ensure_dir(&config.app.output_dir)?;

    info!(
        "Canvas {}x{} | Background: {} | Acceptance policy {}",
        config.canvas.width,
        config.canvas.height,
        pipeline.background().describe(),
        config.acceptance.as_str()
    );

    let controller = IngestionController::new(config, pipeline);

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let watcher = DirectoryWatcher::new(
        &config.app.input_dir,
        Duration::from_millis(config.ingestion.poll_interval_ms),
        config.ingestion.scan_existing,
    );
    let (tx, rx) = mpsc::channel(ARRIVAL_QUEUE_DEPTH);

    let producer = if args.once {
        let files = watcher.scan()?;
        info!(
            "Found {} file(s) in {}",
            files.len(),
            config.app.input_dir.display()
        );
        tokio::spawn(async move {
            for path in files {
                if tx.send(Arrival::created(path)).await.is_err() {
                    break;
                }
            }
            Ok::<(), Error>(())
        })
    } else {
        tokio::spawn(watcher.run(tx, shutdown.clone()))
    };

    let summary = controller.run(rx, shutdown.clone()).await;
    shutdown.cancel();

    match producer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_fatal() => return Err(e),
        Ok(Err(e)) => warn!("Watcher stopped with error: {}", e),
        Err(e) => warn!("Watcher task failed: {}", e),
    }

    info!("Session summary: {}", summary);

    if args.once && summary.done == 0 && summary.failed > 0 {
        return Err(Error::render_failed(format!(
            "All {} job(s) failed",
            summary.failed
        )));
    }

    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down: interrupt received, no new files will be accepted");
                shutdown.cancel();
            }
            Err(e) => warn!("Unable to listen for interrupt signal: {}", e),
        }
    });
}
