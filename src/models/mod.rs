//! Data models for plex-cleanup.
//!
//! - [`Settings`]: Script settings loaded from `plex-cleanup.json` plus environment overrides
//! - [`Library`], [`Collection`], [`Movie`]: Plex objects as the cleanup passes see them
//!
//! Plex objects are never persisted. Every pass fetches them again.

pub mod config;
pub mod media;

pub use self::config::{ConfigError, PLACEHOLDER_API_KEY, PLACEHOLDER_PLEX_URL, Settings};
pub use self::media::{Collection, Library, Movie};
