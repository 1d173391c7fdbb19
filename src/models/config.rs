use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// URL written into a freshly created config file.
pub const PLACEHOLDER_PLEX_URL: &str = "https://plex-ip-or-hostname:32400/";

/// Token written into a freshly created config file.
pub const PLACEHOLDER_API_KEY: &str = "<insert_api_key_here>";

/// Script settings loaded from `plex-cleanup.json`
///
/// Every key can be overridden by an environment variable with the same
/// name in upper case (`PLEX_URL`, `MINIMUM_COLLECTION_SIZE`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub plex_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_movie_libraries")]
    pub movie_libraries: IndexSet<String>,

    #[serde(default = "default_minimum_collection_size")]
    pub minimum_collection_size: u32,

    #[serde(default)]
    pub delete_undersized_collections: bool,

    #[serde(default)]
    pub enforce_movie_names_match_file_names: bool,

    /// Every character of every entry is ignored when comparing titles with file names
    #[serde(default = "default_skip_characters")]
    pub movie_name_enforce_skip_characters: IndexSet<String>,

    /// Titles containing any of these (case-sensitive) are never renamed
    #[serde(default)]
    pub enforce_movie_names_exclude: IndexSet<String>,

    #[serde(default)]
    pub verify_ssl: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Validation failures for [`Settings`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is empty, set it in the config file or the {env} environment variable")]
    MissingField { key: &'static str, env: &'static str },

    #[error("{0} still holds the placeholder value, edit the config file before running")]
    Placeholder(&'static str),

    #[error("plex_url is not a valid http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("request_timeout_secs must be at least 1")]
    InvalidTimeout,
}

impl Settings {
    /// Settings written on first run, with placeholders the operator must replace
    pub fn template() -> Self {
        Self {
            plex_url: PLACEHOLDER_PLEX_URL.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            ..Self::with_defaults()
        }
    }

    /// Optional fields at their defaults, required fields empty
    pub fn with_defaults() -> Self {
        Self {
            plex_url: String::new(),
            api_key: String::new(),
            movie_libraries: default_movie_libraries(),
            minimum_collection_size: default_minimum_collection_size(),
            delete_undersized_collections: false,
            enforce_movie_names_match_file_names: false,
            movie_name_enforce_skip_characters: default_skip_characters(),
            enforce_movie_names_exclude: IndexSet::new(),
            verify_ssl: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Check required fields after the environment overlay
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plex_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                key: "plex_url",
                env: "PLEX_URL",
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                key: "api_key",
                env: "API_KEY",
            });
        }
        if self.plex_url == PLACEHOLDER_PLEX_URL {
            return Err(ConfigError::Placeholder("plex_url"));
        }
        if self.api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::Placeholder("api_key"));
        }

        match reqwest::Url::parse(self.plex_url.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidUrl(self.plex_url.clone())),
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Check if a movie title hits the exclude list
    pub fn is_excluded(&self, title: &str) -> bool {
        self.enforce_movie_names_exclude
            .iter()
            .any(|exclude| title.contains(exclude.as_str()))
    }
}

fn default_movie_libraries() -> IndexSet<String> {
    IndexSet::from(["Movies".to_string()])
}

fn default_minimum_collection_size() -> u32 {
    2
}

fn default_skip_characters() -> IndexSet<String> {
    [":", "-", ".", "?"].into_iter().map(String::from).collect()
}

fn default_request_timeout_secs() -> u64 {
    30
}
