//! Checkpoint store backed by the target platform's custom-object store.

use std::sync::Arc;

use async_trait::async_trait;

use catsync_state::{CheckpointStore, StateError, StoreVersion, VersionedCheckpoint};
use catsync_types::checkpoint::ProgressCheckpoint;
use catsync_types::error::ClientError;
use catsync_types::resource::ResourceType;

use crate::client::PlatformClient;

/// Reserved custom-object container for sync checkpoints.
pub const CHECKPOINT_CONTAINER: &str = "catsync.checkpoints";

/// [`CheckpointStore`] persisting checkpoints in the target instance's
/// durable key-value store, one object per resource type under the reserved
/// [`CHECKPOINT_CONTAINER`] namespace.
///
/// The platform's object version doubles as the store version, so a
/// concurrent run against the same target surfaces as
/// [`StateError::VersionConflict`].
pub struct PlatformCheckpointStore {
    client: Arc<dyn PlatformClient>,
}

impl PlatformCheckpointStore {
    /// Create a store writing through the given target client.
    #[must_use]
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }
}

fn remote_failure(operation: &str, err: &ClientError) -> StateError {
    StateError::store(format!("{operation}: {err}"))
}

#[async_trait]
impl CheckpointStore for PlatformCheckpointStore {
    async fn get(
        &self,
        resource_type: &ResourceType,
    ) -> Result<Option<VersionedCheckpoint>, StateError> {
        let object = self
            .client
            .get_custom_object(CHECKPOINT_CONTAINER, resource_type.as_str())
            .await
            .map_err(|e| remote_failure("get checkpoint", &e))?;

        match object {
            None => Ok(None),
            Some(object) => {
                let checkpoint: ProgressCheckpoint = serde_json::from_value(object.value)?;
                Ok(Some(VersionedCheckpoint {
                    checkpoint,
                    version: StoreVersion::new(object.version),
                }))
            }
        }
    }

    async fn set(
        &self,
        checkpoint: &ProgressCheckpoint,
        expected: Option<StoreVersion>,
    ) -> Result<StoreVersion, StateError> {
        let value = serde_json::to_value(checkpoint)?;
        let result = self
            .client
            .set_custom_object(
                CHECKPOINT_CONTAINER,
                checkpoint.resource_type.as_str(),
                &value,
                expected.map(StoreVersion::value),
            )
            .await;

        match result {
            Ok(version) => Ok(StoreVersion::new(version)),
            Err(err) if err.is_version_conflict() => Err(StateError::VersionConflict {
                resource_type: checkpoint.resource_type.clone(),
            }),
            Err(err) => Err(remote_failure("set checkpoint", &err)),
        }
    }
}
