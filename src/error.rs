//! Error type shared by the persistence layer and the coordinator. The TUI
//! wraps these in `anyhow` like the rest of the application code.

use thiserror::Error;

/// Failures raised by the movie store and the writes dispatched through the
/// coordinator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage engine failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("rating must be a whole number from 1 to 10, got {0:?}")]
    InvalidRating(String),

    #[error("database connection lock was poisoned")]
    Poisoned,

    #[error("movie store was closed")]
    Closed,

    #[error("background store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
