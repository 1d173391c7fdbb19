//! Pass runner.
//!
//! One pass resolves the configured libraries, cleans up undersized
//! collections, then enforces movie names. [`Runner::run_continuous`] repeats
//! passes on an interval until the shutdown channel flips to `true`. The
//! shutdown flag is only checked between passes, so a pass that has started
//! always runs to the end.

use crate::metrics::Metrics;
use crate::models::Settings;
use crate::services::collections::{self, CollectionReport};
use crate::services::names::{NameEnforcer, NameReport};
use crate::services::plex::{MediaServer, PlexError};
use crate::services::scanner;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Everything one pass saw and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Configured libraries the server doesn't have
    pub missing_libraries: Vec<String>,
    /// Libraries skipped because listing them failed
    pub failed_libraries: Vec<String>,
    pub libraries_scanned: usize,
    pub collections: CollectionReport,
    pub names: NameReport,
    pub duration: Duration,
}

impl PassSummary {
    fn log(&self) {
        tracing::info!(
            "Total filtered collections: {}",
            self.collections.undersized.len()
        );
        tracing::info!(
            "Total collection count enumerated: {} from {} libraries",
            self.collections.enumerated,
            self.libraries_scanned
        );
        if !self.missing_libraries.is_empty() {
            tracing::warn!("Missing libraries: {}", self.missing_libraries.join(", "));
        }
        if !self.failed_libraries.is_empty() {
            tracing::warn!("Failed libraries: {}", self.failed_libraries.join(", "));
        }
        tracing::info!(
            "Pass finished in {:.2}s: {}; {} movies checked, {} renamed",
            self.duration.as_secs_f32(),
            self.collections.summary(),
            self.names.checked,
            self.names.renamed.len()
        );
    }
}

/// Runs cleanup passes against one media server
pub struct Runner<S> {
    server: S,
    settings: Settings,
    names: NameEnforcer,
    metrics: Metrics,
}

impl<S: MediaServer> Runner<S> {
    pub fn new(server: S, settings: Settings) -> Self {
        Self {
            server,
            settings,
            names: NameEnforcer::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one full pass: scan, decide, act.
    ///
    /// # Errors
    ///
    /// Fails only when the library list can't be fetched. Failures of a single
    /// library or a single delete/rename are logged and recorded in the summary.
    pub async fn run_pass(&self) -> Result<PassSummary, PlexError> {
        let start = Instant::now();

        let scan =
            match scanner::resolve_libraries(&self.server, &self.settings.movie_libraries).await {
                Ok(scan) => scan,
                Err(e) => {
                    self.metrics.record_pass_failed(start.elapsed());
                    return Err(e);
                }
            };

        let collection_scan = scanner::scan_collections(&self.server, &scan.libraries).await;
        let collection_report =
            collections::cleanup_collections(&self.server, &collection_scan.items, &self.settings)
                .await;

        let movie_scan = scanner::scan_movies(&self.server, &scan.libraries).await;
        let name_report = self
            .names
            .enforce(&self.server, &movie_scan.items, &self.settings)
            .await;

        let mut failed_libraries = collection_scan.failed_libraries;
        for library in movie_scan.failed_libraries {
            if !failed_libraries.contains(&library) {
                failed_libraries.push(library);
            }
        }

        let summary = PassSummary {
            missing_libraries: scan.missing,
            failed_libraries,
            libraries_scanned: scan.libraries.len(),
            collections: collection_report,
            names: name_report,
            duration: start.elapsed(),
        };

        self.metrics.record_pass(
            summary.duration,
            summary.collections.deleted.len(),
            summary.collections.failed.len(),
            summary.names.renamed.len(),
            summary.names.failed.len(),
        );
        summary.log();

        Ok(summary)
    }

    /// Repeat passes every `interval` until `shutdown` becomes `true`.
    ///
    /// A failed pass is logged and the next one runs on schedule.
    ///
    /// # Returns
    /// The number of passes started
    pub async fn run_continuous(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut passes = 0;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, not starting another pass");
                break;
            }

            passes += 1;
            tracing::info!("Starting cleanup pass {}", passes);
            if let Err(e) = self.run_pass().await {
                tracing::error!("Cleanup pass {} failed: {}", passes, e);
            }

            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, not starting another pass");
                break;
            }

            tracing::info!("Next pass in {}s", interval.as_secs());
            let sleep = tokio::time::sleep(interval);
            tokio::pin!(sleep);

            let sender_gone = tokio::select! {
                _ = &mut sleep => false,
                stopped = shutdown.wait_for(|stop| *stop) => stopped.is_err(),
            };

            // Nobody can cancel any more, finish the wait normally
            if sender_gone {
                (&mut sleep).await;
            }
        }

        passes
    }
}
