use crate::models::{Collection, Settings};
use crate::services::plex::MediaServer;

/// What to do with a scanned collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    /// Big enough, leave it alone
    Keep,

    /// Undersized, deletion disabled: only report it
    Report,

    /// Undersized and deletion enabled
    Delete,
}

/// Result of a cleanup run over the scanned collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub enumerated: usize,
    /// Titles of every undersized collection, deleted or not
    pub undersized: Vec<String>,
    pub deleted: Vec<String>,
    /// Title and error message of each failed deletion
    pub failed: Vec<(String, String)>,
}

impl CollectionReport {
    /// Get a summary string of the run
    pub fn summary(&self) -> String {
        format!(
            "{} collections enumerated, {} undersized, {} deleted, {} failed",
            self.enumerated,
            self.undersized.len(),
            self.deleted.len(),
            self.failed.len()
        )
    }
}

/// Decide the action for one collection
pub fn decide(collection: &Collection, settings: &Settings) -> CollectionAction {
    tracing::debug!(
        "Validating collection size: [collection_name]{} [collection_members]{} [member_minimum]{}",
        collection.title,
        collection.member_count,
        settings.minimum_collection_size
    );

    if !collection.is_undersized(settings.minimum_collection_size) {
        CollectionAction::Keep
    } else if settings.delete_undersized_collections {
        CollectionAction::Delete
    } else {
        CollectionAction::Report
    }
}

/// Delete or report every undersized collection.
///
/// A failed deletion is logged and the run moves on to the next collection.
pub async fn cleanup_collections<S>(
    server: &S,
    collections: &[Collection],
    settings: &Settings,
) -> CollectionReport
where
    S: MediaServer + ?Sized,
{
    let mut report = CollectionReport {
        enumerated: collections.len(),
        ..Default::default()
    };

    for collection in collections {
        match decide(collection, settings) {
            CollectionAction::Keep => {}
            CollectionAction::Report => {
                tracing::info!(
                    "We would delete this undersized movie collection: {} ({} members, library {})",
                    collection.title,
                    collection.member_count,
                    collection.library
                );
                report.undersized.push(collection.title.clone());
            }
            CollectionAction::Delete => {
                report.undersized.push(collection.title.clone());
                tracing::debug!("Attempting to delete movie collection: {}", collection.title);

                match server.delete_collection(collection).await {
                    Ok(()) => {
                        tracing::info!("Deleted movie collection: {}", collection.title);
                        report.deleted.push(collection.title.clone());
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to delete collection {}: {}",
                            collection.title,
                            e
                        );
                        report
                            .failed
                            .push((collection.title.clone(), e.to_string()));
                    }
                }
            }
        }
    }

    tracing::info!("Collection cleanup: {}", report.summary());
    report
}
