use crate::models::{Movie, Settings};
use crate::services::plex::MediaServer;
use indexmap::IndexSet;
use regex::Regex;
use std::collections::HashSet;

/// What to do with one movie title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameDecision {
    /// Title hits the exclude list
    Excluded,

    /// Plex has no usable file path for the movie
    NoFile,

    /// Title and file name agree after normalization
    Match,

    /// Mismatch and enforcement on
    Rename { to: String },

    /// Mismatch and enforcement off
    Report { to: String },
}

/// Result of a name enforcement run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameReport {
    pub checked: usize,
    pub excluded: usize,
    pub no_file: usize,
    /// (current title, file display name) for every mismatch
    pub mismatched: Vec<(String, String)>,
    /// (old title, new title)
    pub renamed: Vec<(String, String)>,
    /// Title and error message of each failed rename
    pub failed: Vec<(String, String)>,
}

/// Lowercase, drop every skip character, collapse whitespace.
///
/// Each entry of `skip_characters` contributes all of its characters.
/// Applying this to its own output returns the output unchanged.
pub fn normalize(value: &str, skip_characters: &IndexSet<String>) -> String {
    let skipped: HashSet<char> = skip_characters
        .iter()
        .flat_map(|entry| entry.to_lowercase().chars().collect::<Vec<_>>())
        .collect();

    let stripped: String = value
        .to_lowercase()
        .chars()
        .filter(|c| !skipped.contains(c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compares movie titles with file names and renames mismatches
///
/// # Fields
///
/// - `extension`: Matches a trailing file extension such as `.mkv` or `.m2ts`
///   - Pattern: `\.[A-Za-z][A-Za-z0-9]{1,4}$`
///   - Extensions must start with a letter so `Movie.2001` keeps its year
///
/// - `year_tag`: Matches a bracketed release year and everything after it
///   - Pattern: `\s*[\(\[](?:18|19|20)\d{2}[\)\]].*$`
///   - Example match: ` (2001) {imdb-tt0211915}`
pub struct NameEnforcer {
    extension: Regex,
    year_tag: Regex,
}

impl NameEnforcer {
    /// Create a new NameEnforcer with compiled regex patterns
    pub fn new() -> Self {
        Self {
            extension: Regex::new(r"\.[A-Za-z][A-Za-z0-9]{1,4}$").expect("Invalid extension regex"),
            year_tag: Regex::new(r"\s*[\(\[](?:18|19|20)\d{2}[\)\]].*$")
                .expect("Invalid year tag regex"),
        }
    }

    /// Title implied by a media file path.
    ///
    /// `/movies/Amelie (2001)/Amelie (2001).mkv` gives `Amelie`.
    /// Both `/` and `\` separate path segments since Plex may run on Windows.
    pub fn file_display_name(&self, file: &str) -> Option<String> {
        let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
        let stem = self.extension.replace(base, "");
        let name = self.year_tag.replace(&stem, "");
        let name = name.trim();

        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Decide what to do with one movie.
    ///
    /// The exclude list is checked before anything else, so excluded titles
    /// are never renamed.
    pub fn decide(&self, movie: &Movie, settings: &Settings) -> NameDecision {
        if settings.is_excluded(&movie.title) {
            tracing::debug!("Skipping matching movie in provided exclude list: {}", movie.title);
            return NameDecision::Excluded;
        }

        let Some(file_name) = movie
            .file
            .as_deref()
            .and_then(|file| self.file_display_name(file))
        else {
            tracing::debug!("Movie {} has no usable file path", movie.title);
            return NameDecision::NoFile;
        };

        tracing::debug!("Movie: {} | File: {}", movie.title, file_name);

        let skip = &settings.movie_name_enforce_skip_characters;
        if normalize(&movie.title, skip) == normalize(&file_name, skip) {
            return NameDecision::Match;
        }

        if settings.enforce_movie_names_match_file_names {
            NameDecision::Rename { to: file_name }
        } else {
            NameDecision::Report { to: file_name }
        }
    }

    /// Check every movie and rename or report the mismatches.
    ///
    /// A failed rename is logged and the run moves on to the next movie.
    pub async fn enforce<S>(&self, server: &S, movies: &[Movie], settings: &Settings) -> NameReport
    where
        S: MediaServer + ?Sized,
    {
        tracing::debug!("Starting movie file and name match enforcement");
        let mut report = NameReport::default();

        for movie in movies {
            report.checked += 1;

            match self.decide(movie, settings) {
                NameDecision::Excluded => report.excluded += 1,
                NameDecision::NoFile => report.no_file += 1,
                NameDecision::Match => {}
                NameDecision::Report { to } => {
                    tracing::info!(
                        "Movie name doesn't match file name: {} != {}",
                        movie.title,
                        to
                    );
                    report.mismatched.push((movie.title.clone(), to));
                }
                NameDecision::Rename { to } => {
                    report.mismatched.push((movie.title.clone(), to.clone()));

                    match server.rename_movie(movie, &to).await {
                        Ok(()) => {
                            tracing::info!(
                                "Updated Movie Title & Sort Title: {} => {}",
                                movie.title,
                                to
                            );
                            report.renamed.push((movie.title.clone(), to));
                        }
                        Err(e) => {
                            tracing::error!("Failed to rename movie {}: {}", movie.title, e);
                            report.failed.push((movie.title.clone(), e.to_string()));
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Finished movie name enforcement, fixed {} movies ({} mismatched, {} excluded)",
            report.renamed.len(),
            report.mismatched.len(),
            report.excluded
        );
        report
    }
}

impl Default for NameEnforcer {
    fn default() -> Self {
        Self::new()
    }
}
