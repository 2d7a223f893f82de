//! Checkpoint store error types.

use catsync_types::resource::ResourceType;

/// Errors produced by [`CheckpointStore`](crate::CheckpointStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The expected checkpoint version did not match the stored one.
    ///
    /// Indicates a concurrent run writing progress for the same resource
    /// type; fatal for the run that observes it.
    #[error("checkpoint version conflict for resource type '{resource_type}'")]
    VersionConflict { resource_type: ResourceType },

    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint payload could not be (de)serialized.
    #[error("checkpoint serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("checkpoint store lock poisoned")]
    LockPoisoned,

    /// Backend-specific failure with operation context.
    #[error("checkpoint store error: {0}")]
    Store(String),
}

impl StateError {
    /// Wrap a backend failure with operation context.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
