//! Plex Media Server client.
//!
//! [`MediaServer`] is the seam between the cleanup engines and the server.
//! [`PlexClient`] implements it over the Plex HTTP API with JSON responses.

use crate::models::{Collection, Library, Movie, Settings};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

/// Plex `type` filter for movies
const MOVIE_TYPE: &str = "1";

/// Errors returned by the media server
#[derive(Error, Debug)]
pub enum PlexError {
    #[error("Invalid Plex URL {0}")]
    InvalidUrl(String),

    #[error("Invalid Plex token")]
    InvalidToken,

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Plex returned {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Failed to decode Plex response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Operations the cleanup passes need from the media server.
///
/// Every call may fail on its own; callers decide whether a failure is
/// fatal for the pass or only for the item.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// List every library section on the server
    async fn list_libraries(&self) -> Result<Vec<Library>, PlexError>;

    /// List the collections of a library with their member counts
    async fn list_collections(&self, library: &Library) -> Result<Vec<Collection>, PlexError>;

    /// Delete a collection; the member movies are left untouched
    async fn delete_collection(&self, collection: &Collection) -> Result<(), PlexError>;

    /// List the movies of a library with their file paths
    async fn list_movies(&self, library: &Library) -> Result<Vec<Movie>, PlexError>;

    /// Set the title and sort title of a movie
    async fn rename_movie(&self, movie: &Movie, title: &str) -> Result<(), PlexError>;
}

/// Server identity reported by `GET /`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "friendlyName", default)]
    pub friendly_name: String,

    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryContainer {
    #[serde(rename = "Directory", default)]
    directory: Vec<SectionEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataContainer<T> {
    #[serde(rename = "Metadata", default = "Vec::new")]
    metadata: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SectionEntry {
    #[serde(deserialize_with = "string_or_number")]
    key: String,
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    #[serde(rename = "ratingKey", deserialize_with = "string_or_number")]
    rating_key: String,
    title: String,
    #[serde(rename = "childCount", default, deserialize_with = "count")]
    child_count: u32,
}

#[derive(Debug, Deserialize)]
struct MovieEntry {
    #[serde(rename = "ratingKey", deserialize_with = "string_or_number")]
    rating_key: String,
    title: String,
    #[serde(rename = "Media", default)]
    media: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(rename = "Part", default)]
    parts: Vec<PartEntry>,
}

#[derive(Debug, Deserialize)]
struct PartEntry {
    #[serde(default)]
    file: Option<String>,
}

impl MovieEntry {
    fn first_file(&self) -> Option<String> {
        self.media
            .iter()
            .flat_map(|media| media.parts.iter())
            .find_map(|part| part.file.clone())
    }
}

/// Plex sends some identifiers as strings and some as numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => u32::try_from(n).map_err(serde::de::Error::custom),
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Plex HTTP API client
#[derive(Debug, Clone)]
pub struct PlexClient {
    base_url: Url,
    client: Client,
}

impl PlexClient {
    /// Build a client from the settings without contacting the server
    pub fn new(settings: &Settings) -> Result<Self, PlexError> {
        let trimmed = settings.plex_url.trim();
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let base_url =
            Url::parse(&with_slash).map_err(|_| PlexError::InvalidUrl(settings.plex_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-plex-token",
            HeaderValue::from_str(settings.api_key.trim()).map_err(|_| PlexError::InvalidToken)?,
        );
        headers.insert("x-plex-product", HeaderValue::from_static(crate::APP_NAME));
        headers.insert(
            "x-plex-client-identifier",
            HeaderValue::from_static(crate::APP_NAME),
        );
        headers.insert("x-plex-version", HeaderValue::from_static(crate::VERSION));

        if !settings.verify_ssl {
            tracing::debug!("TLS certificate verification is disabled for {}", base_url);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|source| PlexError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self { base_url, client })
    }

    /// Build a client and check that the server answers
    pub async fn connect(settings: &Settings) -> Result<Self, PlexError> {
        let client = Self::new(settings)?;
        client.check_connection().await?;
        Ok(client)
    }

    /// Build a client and check the server, but only warn when it is unreachable.
    ///
    /// Used by continuous mode, where the next pass reports the failure and
    /// the one after it may succeed once the server is back.
    pub async fn connect_deferred(settings: &Settings) -> Result<Self, PlexError> {
        let client = Self::new(settings)?;
        if let Err(e) = client.check_connection().await {
            tracing::warn!(
                "Plex server at {} is not reachable yet, passes will fail until it is: {}",
                client.base_url,
                e
            );
        }
        Ok(client)
    }

    async fn check_connection(&self) -> Result<(), PlexError> {
        tracing::info!("Attempting to connect to plex instance at: {}", self.base_url);

        let info = self.server_info().await?;
        tracing::info!(
            "Successfully connected to plex instance {} (version {})",
            info.friendly_name,
            info.version
        );
        Ok(())
    }

    /// Fetch the server identity
    pub async fn server_info(&self) -> Result<ServerInfo, PlexError> {
        let url = self.endpoint("")?;
        let envelope: Envelope<ServerInfo> = self.get_json(url).await?;
        Ok(envelope.media_container)
    }

    /// Resolve a path relative to the server root
    pub fn endpoint(&self, path: &str) -> Result<Url, PlexError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| PlexError::InvalidUrl(format!("{}{}", self.base_url, path)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, PlexError> {
        tracing::debug!("GET {}", url);
        let response = self.send(Method::GET, url.clone()).await?;
        response.json::<T>().await.map_err(|source| PlexError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, PlexError> {
        let response = self
            .client
            .request(method, url.clone())
            .send()
            .await
            .map_err(|source| PlexError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlexError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn list_libraries(&self) -> Result<Vec<Library>, PlexError> {
        let url = self.endpoint("library/sections")?;
        let envelope: Envelope<DirectoryContainer> = self.get_json(url).await?;

        Ok(envelope
            .media_container
            .directory
            .into_iter()
            .map(|entry| Library {
                key: entry.key,
                title: entry.title,
                kind: entry.kind,
            })
            .collect())
    }

    async fn list_collections(&self, library: &Library) -> Result<Vec<Collection>, PlexError> {
        let url = self.endpoint(&format!("library/sections/{}/collections", library.key))?;
        let envelope: Envelope<MetadataContainer<CollectionEntry>> = self.get_json(url).await?;

        Ok(envelope
            .media_container
            .metadata
            .into_iter()
            .map(|entry| Collection {
                rating_key: entry.rating_key,
                title: entry.title,
                library: library.title.clone(),
                member_count: entry.child_count,
            })
            .collect())
    }

    async fn delete_collection(&self, collection: &Collection) -> Result<(), PlexError> {
        let url = self.endpoint(&format!("library/collections/{}", collection.rating_key))?;
        tracing::debug!("DELETE {}", url);
        self.send(Method::DELETE, url).await?;
        Ok(())
    }

    async fn list_movies(&self, library: &Library) -> Result<Vec<Movie>, PlexError> {
        let mut url = self.endpoint(&format!("library/sections/{}/all", library.key))?;
        url.query_pairs_mut().append_pair("type", MOVIE_TYPE);
        let envelope: Envelope<MetadataContainer<MovieEntry>> = self.get_json(url).await?;

        Ok(envelope
            .media_container
            .metadata
            .into_iter()
            .map(|entry| Movie {
                file: entry.first_file(),
                rating_key: entry.rating_key,
                title: entry.title,
                library: library.title.clone(),
                library_key: library.key.clone(),
            })
            .collect())
    }

    async fn rename_movie(&self, movie: &Movie, title: &str) -> Result<(), PlexError> {
        let section_all = self.endpoint(&format!("library/sections/{}/all", movie.library_key))?;
        let url = rename_url(&section_all, movie, title);
        tracing::debug!("PUT {}", url);
        self.send(Method::PUT, url).await?;
        Ok(())
    }
}

/// Edit query that sets and locks the title and sort title
fn rename_url(section_all: &Url, movie: &Movie, title: &str) -> Url {
    let mut url = section_all.clone();
    url.query_pairs_mut()
        .append_pair("type", MOVIE_TYPE)
        .append_pair("id", &movie.rating_key)
        .append_pair("title.value", title)
        .append_pair("title.locked", "1")
        .append_pair("titleSort.value", title)
        .append_pair("titleSort.locked", "1");
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> Settings {
        Settings {
            plex_url: url.to_string(),
            api_key: "token".to_string(),
            ..Settings::with_defaults()
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_fatal_only_for_connect() {
        // Nothing listens on the discard port
        let mut config = settings("http://127.0.0.1:9");
        config.request_timeout_secs = 2;

        assert!(matches!(
            PlexClient::connect(&config).await,
            Err(PlexError::Request { .. })
        ));
        assert!(PlexClient::connect_deferred(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal_for_deferred_connect() {
        let config = settings("not a url");
        assert!(matches!(
            PlexClient::connect_deferred(&config).await,
            Err(PlexError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = PlexClient::new(&settings("http://nas.local:32400/plex")).unwrap();
        let url = client.endpoint("/library/sections").unwrap();
        assert_eq!(url.as_str(), "http://nas.local:32400/plex/library/sections");
    }

    #[test]
    fn test_invalid_token_header_is_rejected() {
        let mut bad = settings("http://plex:32400");
        bad.api_key = "line\nbreak".to_string();
        assert!(matches!(PlexClient::new(&bad), Err(PlexError::InvalidToken)));
    }

    #[test]
    fn test_parse_sections() {
        let json = r#"{"MediaContainer": {"size": 2, "Directory": [
            {"key": "1", "title": "Movies", "type": "movie"},
            {"key": 2, "title": "TV Shows", "type": "show"}
        ]}}"#;
        let envelope: Envelope<DirectoryContainer> = serde_json::from_str(json).unwrap();
        let sections = envelope.media_container.directory;

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].key, "2");
        assert_eq!(sections[1].kind, "show");
    }

    #[test]
    fn test_parse_collections_with_string_counts() {
        let json = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "101", "title": "Rocky", "childCount": "1"},
            {"ratingKey": 102, "title": "Alien", "childCount": 4}
        ]}}"#;
        let envelope: Envelope<MetadataContainer<CollectionEntry>> =
            serde_json::from_str(json).unwrap();
        let collections = envelope.media_container.metadata;

        assert_eq!(collections[0].child_count, 1);
        assert_eq!(collections[1].rating_key, "102");
        assert_eq!(collections[1].child_count, 4);
    }

    #[test]
    fn test_parse_empty_container() {
        let json = r#"{"MediaContainer": {"size": 0}}"#;
        let envelope: Envelope<MetadataContainer<CollectionEntry>> =
            serde_json::from_str(json).unwrap();
        assert!(envelope.media_container.metadata.is_empty());

        let envelope: Envelope<MetadataContainer<MovieEntry>> =
            serde_json::from_str(json).unwrap();
        assert!(envelope.media_container.metadata.is_empty());
    }

    #[test]
    fn test_parse_movie_file() {
        let json = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "7", "title": "Amelie", "Media": [
                {"Part": [{"file": "/data/movies/Amelie (2001)/Amelie (2001).mkv"}]}
            ]},
            {"ratingKey": "8", "title": "Ghost"}
        ]}}"#;
        let envelope: Envelope<MetadataContainer<MovieEntry>> =
            serde_json::from_str(json).unwrap();
        let movies = envelope.media_container.metadata;

        assert_eq!(
            movies[0].first_file().as_deref(),
            Some("/data/movies/Amelie (2001)/Amelie (2001).mkv")
        );
        assert_eq!(movies[1].first_file(), None);
    }

    #[test]
    fn test_rename_url_sets_and_locks_titles() {
        let base = Url::parse("http://plex:32400/library/sections/3/all").unwrap();
        let movie = Movie {
            rating_key: "55".to_string(),
            title: "Amelie".to_string(),
            file: None,
            library: "Movies".to_string(),
            library_key: "3".to_string(),
        };

        let url = rename_url(&base, &movie, "Amélie & Co");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("id".to_string(), "55".to_string())));
        assert!(pairs.contains(&("title.value".to_string(), "Amélie & Co".to_string())));
        assert!(pairs.contains(&("titleSort.locked".to_string(), "1".to_string())));
    }
}
