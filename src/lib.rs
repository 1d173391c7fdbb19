// plex-cleanup - Housekeeping for Plex movie libraries
//
// This is the library crate containing the cleanup engines and data structures.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod services;

// Re-export commonly used types for convenience
pub use crate::config::{ConfigLoad, ConfigManager};
pub use models::{Collection, Library, Movie, Settings};
pub use runner::{PassSummary, Runner};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
