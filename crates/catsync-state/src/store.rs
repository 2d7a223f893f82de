//! Checkpoint store trait definition.
//!
//! [`CheckpointStore`] defines the storage contract for resumable sync
//! progress. Checkpoint model types live in [`catsync_types::checkpoint`].

use async_trait::async_trait;

use catsync_types::checkpoint::ProgressCheckpoint;
use catsync_types::resource::ResourceType;

use crate::error;

/// Version token guarding checkpoint writes against concurrent runs.
///
/// Distinct from a resource [`Version`](catsync_types::resource::Version):
/// this one versions the stored checkpoint record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreVersion(u64);

impl StoreVersion {
    /// Wrap a raw store version.
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self(version)
    }

    /// The raw version number.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A checkpoint together with the store version that guarded its read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedCheckpoint {
    pub checkpoint: ProgressCheckpoint,
    pub version: StoreVersion,
}

/// Storage contract for sync-progress checkpoints.
///
/// Implementations must be `Send + Sync` for use behind
/// `Arc<dyn CheckpointStore>`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the current checkpoint for a resource type.
    ///
    /// Returns `Ok(None)` when no checkpoint has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    async fn get(
        &self,
        resource_type: &ResourceType,
    ) -> error::Result<Option<VersionedCheckpoint>>;

    /// Compare-and-set the checkpoint for its resource type.
    ///
    /// When `expected` is `Some`, succeeds only if the stored version
    /// matches; when `None`, succeeds only if no checkpoint exists yet.
    /// Returns the new store version on success.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::VersionConflict`](crate::StateError::VersionConflict)
    /// when the precondition fails — the caller must treat this as a
    /// concurrent run and abort. Other variants indicate storage failure.
    async fn set(
        &self,
        checkpoint: &ProgressCheckpoint,
        expected: Option<StoreVersion>,
    ) -> error::Result<StoreVersion>;
}
