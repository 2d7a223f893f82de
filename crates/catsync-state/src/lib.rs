//! Checkpoint persistence for the catsync engine.
//!
//! Provides the [`CheckpointStore`] trait and a [`SqliteCheckpointStore`]
//! implementation for durable, versioned sync-progress checkpoints.

#![warn(clippy::pedantic)]

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StateError;
pub use sqlite::SqliteCheckpointStore;
pub use store::{CheckpointStore, StoreVersion, VersionedCheckpoint};
