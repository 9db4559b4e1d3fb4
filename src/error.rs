//! Error types for the Cantus data layer

use thiserror::Error;

/// Result type for data-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the data layer
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error (preference values, lyric blobs)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema migration failure, names the step that failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Unique-constraint violation (song code, category name)
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Requested row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller-supplied data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Classify a write failure: SQLite UNIQUE violations become
    /// [`Error::Duplicate`], everything else stays a database error.
    pub(crate) fn from_write(what: &str, e: sqlx::Error) -> Error {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.message().contains("UNIQUE constraint failed") {
                return Error::Duplicate(format!("{}: {}", what, db_err.message()));
            }
        }
        Error::Database(e)
    }
}
