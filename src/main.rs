//! plex-cleanup - command line entry point.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and initialize logging → logs/plex-cleanup.<date>
//! 2. Load `plex-cleanup.json` (written with placeholders and exit on first run)
//! 3. Connect to the Plex server (fatal only in one-shot mode when unreachable)
//! 4. Run one pass, or keep running passes every `--interval` seconds until
//!    SIGINT/SIGTERM arrives. A pass in progress is always finished first.
//! 5. Log the metrics summary

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use plex_cleanup::config::DEFAULT_CONFIG_FILE;
use plex_cleanup::services::PlexClient;
use plex_cleanup::{APP_NAME, ConfigLoad, ConfigManager, Runner, VERSION};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Keep running passes until interrupted
    #[arg(short, long)]
    continuous: bool,

    /// Seconds to wait between passes in continuous mode
    #[arg(short, long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Path of the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: Utf8PathBuf,

    /// Enable debug logging (also enabled by a file named `debug` in the working directory)
    #[arg(short, long)]
    debug: bool,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let debug_mode = args.debug || Utf8PathBuf::from("debug").exists();
    let _guard = plex_cleanup::logging::setup_logging(&args.log_dir, APP_NAME, debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let settings = match ConfigManager::new(&args.config).load()? {
        ConfigLoad::Loaded(settings) => settings,
        ConfigLoad::Created(path) => {
            tracing::info!("Edit {} and run again", path);
            return Ok(());
        }
    };

    // An unreachable server only stops one-shot mode
    let client = if args.continuous {
        PlexClient::connect_deferred(&settings).await
    } else {
        PlexClient::connect(&settings).await
    }
    .context("Failure occurred attempting to connect to the provided plex url")?;
    let runner = Runner::new(client, settings);

    let result = if args.continuous {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(forward_shutdown_signal(shutdown_tx));

        let passes = runner
            .run_continuous(Duration::from_secs(args.interval), shutdown_rx)
            .await;
        tracing::info!("Stopped after {} passes", passes);
        Ok(())
    } else {
        runner
            .run_pass()
            .await
            .map(|_| ())
            .context("Cleanup pass failed")
    };

    runner.metrics().log_summary();
    tracing::info!("Finished script execution");

    result
}

/// Flip the shutdown channel on Ctrl-C, or SIGTERM on unix
async fn forward_shutdown_signal(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::warn!("Shutdown signal received, stopping after the current pass");
    let _ = shutdown.send(true);
}
