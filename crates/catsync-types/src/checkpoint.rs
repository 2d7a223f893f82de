//! Resumable sync progress checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::ResourceType;

/// Durable high-water mark for one resource type's synchronization.
///
/// Read at the start of a run to build the delta query filter, overwritten
/// after every successfully completed page. The timestamp only ever
/// advances; [`ProgressCheckpoint::advanced_to`] enforces monotonicity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCheckpoint {
    pub resource_type: ResourceType,
    pub last_synced_at: DateTime<Utc>,
}

impl ProgressCheckpoint {
    /// Create a checkpoint at the given timestamp.
    #[must_use]
    pub fn new(resource_type: ResourceType, last_synced_at: DateTime<Utc>) -> Self {
        Self {
            resource_type,
            last_synced_at,
        }
    }

    /// The checkpoint advanced to `candidate`, never regressing.
    #[must_use]
    pub fn advanced_to(&self, candidate: DateTime<Utc>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            last_synced_at: self.last_synced_at.max(candidate),
        }
    }
}
