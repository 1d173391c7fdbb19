//! In-memory media server shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use plex_cleanup::services::{MediaServer, PlexError};
use plex_cleanup::{Collection, Library, Movie, Settings};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct FakeState {
    libraries: Vec<Library>,
    collections: Vec<Collection>,
    movies: Vec<Movie>,
    delete_calls: Vec<String>,
    rename_calls: Vec<(String, String)>,
    failing_deletes: HashSet<String>,
    failing_libraries: HashSet<String>,
    sections_down: bool,
    shutdown_on_list_movies: Option<watch::Sender<bool>>,
}

/// A Plex server that keeps its objects in memory and applies deletes and renames
#[derive(Debug, Default)]
pub struct FakeServer {
    state: Mutex<FakeState>,
}

fn error(path: &str, status: StatusCode) -> PlexError {
    PlexError::Status {
        url: format!("http://fake:32400{}", path),
        status,
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(self, key: &str, title: &str) -> Self {
        self.state.lock().unwrap().libraries.push(Library {
            key: key.to_string(),
            title: title.to_string(),
            kind: "movie".to_string(),
        });
        self
    }

    pub fn with_collection(self, key: &str, title: &str, library: &str, members: u32) -> Self {
        self.state.lock().unwrap().collections.push(Collection {
            rating_key: key.to_string(),
            title: title.to_string(),
            library: library.to_string(),
            member_count: members,
        });
        self
    }

    pub fn with_movie(self, key: &str, title: &str, file: &str, library_key: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let library = state
                .libraries
                .iter()
                .find(|l| l.key == library_key)
                .map(|l| l.title.clone())
                .unwrap_or_default();
            state.movies.push(Movie {
                rating_key: key.to_string(),
                title: title.to_string(),
                file: Some(file.to_string()),
                library,
                library_key: library_key.to_string(),
            });
        }
        self
    }

    pub fn failing_delete(self, rating_key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(rating_key.to_string());
        self
    }

    pub fn failing_library(self, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_libraries
            .insert(title.to_string());
        self
    }

    /// Request shutdown from inside a pass, while movies are being listed
    pub fn shutdown_on_list_movies(self, shutdown: watch::Sender<bool>) -> Self {
        self.state.lock().unwrap().shutdown_on_list_movies = Some(shutdown);
        self
    }

    pub fn set_sections_down(&self, down: bool) {
        self.state.lock().unwrap().sections_down = down;
    }

    pub fn collection_titles(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.collections.iter().map(|c| c.title.clone()).collect()
    }

    pub fn movie_title(&self, rating_key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .movies
            .iter()
            .find(|m| m.rating_key == rating_key)
            .map(|m| m.title.clone())
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn rename_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().rename_calls.clone()
    }
}

#[async_trait]
impl MediaServer for FakeServer {
    async fn list_libraries(&self) -> Result<Vec<Library>, PlexError> {
        let state = self.state.lock().unwrap();
        if state.sections_down {
            return Err(error("/library/sections", StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(state.libraries.clone())
    }

    async fn list_collections(&self, library: &Library) -> Result<Vec<Collection>, PlexError> {
        let state = self.state.lock().unwrap();
        if state.failing_libraries.contains(&library.title) {
            return Err(error(
                &format!("/library/sections/{}/collections", library.key),
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        Ok(state
            .collections
            .iter()
            .filter(|c| c.library == library.title)
            .cloned()
            .collect())
    }

    async fn delete_collection(&self, collection: &Collection) -> Result<(), PlexError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(collection.rating_key.clone());
        if state.failing_deletes.contains(&collection.rating_key) {
            return Err(error(
                &format!("/library/collections/{}", collection.rating_key),
                StatusCode::FORBIDDEN,
            ));
        }
        state
            .collections
            .retain(|c| c.rating_key != collection.rating_key);
        Ok(())
    }

    async fn list_movies(&self, library: &Library) -> Result<Vec<Movie>, PlexError> {
        let state = self.state.lock().unwrap();
        if let Some(shutdown) = &state.shutdown_on_list_movies {
            let _ = shutdown.send(true);
        }
        if state.failing_libraries.contains(&library.title) {
            return Err(error(
                &format!("/library/sections/{}/all", library.key),
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        Ok(state
            .movies
            .iter()
            .filter(|m| m.library_key == library.key)
            .cloned()
            .collect())
    }

    async fn rename_movie(&self, movie: &Movie, title: &str) -> Result<(), PlexError> {
        let mut state = self.state.lock().unwrap();
        state
            .rename_calls
            .push((movie.rating_key.clone(), title.to_string()));
        if let Some(existing) = state
            .movies
            .iter_mut()
            .find(|m| m.rating_key == movie.rating_key)
        {
            existing.title = title.to_string();
        }
        Ok(())
    }
}

/// Valid settings with every optional field at its default
pub fn settings() -> Settings {
    Settings {
        plex_url: "http://fake:32400".to_string(),
        api_key: "token".to_string(),
        ..Settings::with_defaults()
    }
}
