mod error;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use shelf_config::Config;
use shelf_feed::{DoubanFeed, FeedSource};
use shelf_storage::BackendHandle;
use shelf_storage::backend::{LocalBackend, ReadOnlyBackend};
use shelf_sync::{HttpDownloader, Reconciler};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing_subscriber::EnvFilter;

/// Mirror a Douban interests feed into a local index file and cover cache.
///
/// Settings are read from the environment (`DOUBAN_ID`, `SAVE_DIR`,
/// `INTERVAL`, ...).
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Run one cycle immediately, then exit.
    #[arg(long)]
    once: bool,
    /// Log what would be written or deleted without touching the save
    /// directory.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Exiting");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().or_raise(|| ErrorKind::Config)?;
    tracing::info!(
        feed_id = %config.feed_id,
        save_dir = %config.save_dir.display(),
        public_url = %config.public_url,
        interval = ?config.interval,
        dry_run = cli.dry_run,
        "Starting"
    );

    let local: BackendHandle =
        Arc::new(LocalBackend::new("save_dir", &config.save_dir).or_raise(|| ErrorKind::Setup)?);
    let backend: BackendHandle = if cli.dry_run {
        Arc::new(ReadOnlyBackend::new(local))
    } else {
        local
    };
    let feed = DoubanFeed::new(&config.feed_id, &config.user_agent, config.timeout).or_raise(|| ErrorKind::Setup)?;
    let downloader = Arc::new(HttpDownloader::from_config(&config).or_raise(|| ErrorKind::Setup)?);
    let reconciler = Reconciler::from_config(&config, backend, downloader);

    if cli.once {
        return cycle(&reconciler, &feed).await.or_raise(|| ErrorKind::Cycle);
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tokio::select! {
        () = sleep(config.initial_delay) => {},
        () = &mut shutdown => return Ok(()),
    }

    // The first tick completes immediately.
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = cycle(&reconciler, &feed).await {
                    tracing::error!(
                        error = ?e,
                        retryable = e.is_retryable(),
                        "Cycle failed; keeping the previous snapshot"
                    );
                }
            },
        }
    }
    tracing::info!("Shut down");
    Ok(())
}

async fn cycle(reconciler: &Reconciler, feed: &dyn FeedSource) -> shelf_sync::error::Result<()> {
    let report = reconciler.run_cycle(feed).await?;
    tracing::info!(changed = report.changed, removed = report.removed.len(), "Cycle complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Could not install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT; shutting down"),
        () = terminate => tracing::info!("Received SIGTERM; shutting down"),
    }
}
