//! Services module - the cleanup engines and the media-server client.
//!
//! # Components
//!
//! - [`plex`]: The [`MediaServer`] trait every engine talks through, and
//!   [`PlexClient`], its implementation over the Plex HTTP API
//!
//! - [`scanner`]: Resolves configured library names and lists collections and
//!   movies per library. Read only; a failing library is skipped
//!
//! - [`collections`]: Decides keep/report/delete for each collection from its
//!   member count and deletes undersized ones when enabled
//!
//! - [`names`]: Normalizes titles and file names, honors the exclude list and
//!   renames mismatched titles when enabled
//!
//! Settings are passed explicitly to every engine. None of them hold state
//! between passes.
//!
//! # Usage Example
//!
//! ```ignore
//! use plex_cleanup::services::{scanner, collections, PlexClient};
//!
//! let client = PlexClient::connect(&settings).await?;
//! let scan = scanner::resolve_libraries(&client, &settings.movie_libraries).await?;
//! let found = scanner::scan_collections(&client, &scan.libraries).await;
//! let report = collections::cleanup_collections(&client, &found.items, &settings).await;
//! ```

pub mod collections;
pub mod names;
pub mod plex;
pub mod scanner;

pub use collections::{CollectionAction, CollectionReport, cleanup_collections};
pub use names::{NameDecision, NameEnforcer, NameReport, normalize};
pub use plex::{MediaServer, PlexClient, PlexError, ServerInfo};
pub use scanner::{LibraryScan, ScanOutcome, resolve_libraries, scan_collections, scan_movies};
