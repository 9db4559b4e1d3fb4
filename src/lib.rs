//! # Cantus Data Layer
//!
//! Local-first persistence for the Cantus songbook app:
//! - SQLite connection pool, schema creation, versioned migrations
//! - Song / category repository with transactional writes
//! - Key-value preference store (string and JSON-typed)
//! - Duplicate detection by normalized lyric signature
//! - Quick-access queue (capped, 24h TTL) persisted as a preference
//! - Import helpers: chord-sheet analysis, LRC parsing, local search
//!
//! The crate is embedded by the app shell; it exposes no process entry
//! point and never installs a tracing subscriber of its own.

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod lyrics;
pub mod matcher;
pub mod quick_access;
pub mod search;

pub use db::models::{Category, NewSong, Song, SongPatch, SyncStatus};
pub use error::{Error, Result};
pub use lyrics::{LyricLine, LyricWord};
