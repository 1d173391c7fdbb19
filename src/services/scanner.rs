use crate::models::{Collection, Library, Movie};
use crate::services::plex::{MediaServer, PlexError};

/// Configured library names resolved against the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryScan {
    pub libraries: Vec<Library>,
    /// Configured names the server doesn't know
    pub missing: Vec<String>,
}

/// Items gathered from every resolved library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    pub items: Vec<T>,
    /// Libraries whose listing failed and were skipped
    pub failed_libraries: Vec<String>,
}

impl<T> Default for ScanOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failed_libraries: Vec::new(),
        }
    }
}

/// Match the configured library names against the server's sections.
///
/// Unknown names are logged and reported as missing. Failing to list the
/// sections at all is an error for the whole pass.
pub async fn resolve_libraries<S, I, N>(server: &S, wanted: I) -> Result<LibraryScan, PlexError>
where
    S: MediaServer + ?Sized,
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let sections = server.list_libraries().await?;
    tracing::debug!("Server reports {} libraries", sections.len());

    let mut scan = LibraryScan::default();
    for name in wanted {
        let name = name.as_ref();
        match sections.iter().find(|section| section.title == name) {
            Some(section) => {
                if section.kind != "movie" {
                    tracing::debug!("Library [{}] has type {}", name, section.kind);
                }
                scan.libraries.push(section.clone());
            }
            None => {
                tracing::warn!("Library [{}] was not found on the server, skipping", name);
                scan.missing.push(name.to_string());
            }
        }
    }

    Ok(scan)
}

/// List the collections of every library with their member counts.
pub async fn scan_collections<S>(server: &S, libraries: &[Library]) -> ScanOutcome<Collection>
where
    S: MediaServer + ?Sized,
{
    let mut outcome = ScanOutcome::default();

    for library in libraries {
        tracing::debug!(
            "Attempting to load collections from movie library: {}",
            library.title
        );
        match server.list_collections(library).await {
            Ok(collections) => {
                tracing::info!(
                    "Library [{}] has a collection count of [{}]",
                    library.title,
                    collections.len()
                );
                outcome.items.extend(collections);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to list collections of library [{}]: {}",
                    library.title,
                    e
                );
                outcome.failed_libraries.push(library.title.clone());
            }
        }
    }

    outcome
}

/// List the movies of every library with their file paths.
pub async fn scan_movies<S>(server: &S, libraries: &[Library]) -> ScanOutcome<Movie>
where
    S: MediaServer + ?Sized,
{
    let mut outcome = ScanOutcome::default();

    for library in libraries {
        match server.list_movies(library).await {
            Ok(movies) => {
                tracing::debug!(
                    "Gathered {} movies from the {} library",
                    movies.len(),
                    library.title
                );
                outcome.items.extend(movies);
            }
            Err(e) => {
                tracing::error!("Error occurred attempting to parse {} movies: {}", library.title, e);
                outcome.failed_libraries.push(library.title.clone());
            }
        }
    }

    tracing::info!(
        "Found a total of {} movies from targeted libraries",
        outcome.items.len()
    );
    outcome
}
