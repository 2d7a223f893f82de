//! Remote platform capability trait.
//!
//! [`PlatformClient`] abstracts one platform instance (source or target):
//! paginated queries, key lookups, optimistic-concurrency updates, resource
//! creation, and the versioned custom-object store used for checkpoints.
//! Transport and authentication live entirely behind this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use catsync_types::action::UpdateAction;
use catsync_types::error::ClientError;
use catsync_types::resource::{
    PageCursor, Resource, ResourceDraft, ResourceKey, ResourceType, Version,
};

/// Query constraints for a paginated resource fetch.
///
/// Results are always ordered by ascending `lastModified` so page completion
/// order matches checkpoint order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Only resources modified at or after this instant.
    pub modified_since: Option<DateTime<Utc>>,
    /// Maximum number of items per page.
    pub page_size: u32,
}

impl QueryFilter {
    /// Filter for a full (non-incremental) scan.
    #[must_use]
    pub fn full(page_size: u32) -> Self {
        Self {
            modified_since: None,
            page_size,
        }
    }

    /// Filter for a delta scan starting at a checkpoint timestamp.
    #[must_use]
    pub fn since(page_size: u32, modified_since: Option<DateTime<Utc>>) -> Self {
        Self {
            modified_since,
            page_size,
        }
    }
}

/// One page of a paginated resource query.
#[derive(Debug, Clone)]
pub struct ResourcePage {
    pub items: Vec<Resource>,
    /// Token for the next page; absent on the last page.
    pub next_cursor: Option<PageCursor>,
}

/// A value in the platform's durable key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomObject {
    pub container: String,
    pub key: String,
    pub value: serde_json::Value,
    pub version: u64,
}

/// Capability handle for one platform instance.
///
/// Implementations must be `Send + Sync` for use behind
/// `Arc<dyn PlatformClient>`, and must enforce a per-call timeout so each
/// remote operation is independently retryable.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetch one page of resources ordered by ascending `lastModified`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport or platform failure.
    async fn fetch_page(
        &self,
        resource_type: &ResourceType,
        filter: &QueryFilter,
        cursor: Option<&PageCursor>,
    ) -> Result<ResourcePage, ClientError>;

    /// Fetch a single resource by its stable key.
    ///
    /// Returns `Ok(None)` if no resource with that key exists. Embedded
    /// references in the returned snapshot are expressed in key form
    /// wherever the referent has a key, so drafts and snapshots compare
    /// directly.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport or platform failure.
    async fn fetch_by_key(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
    ) -> Result<Option<Resource>, ClientError>;

    /// Apply an ordered action list to the resource identified by `key`.
    ///
    /// `expected_version` is the optimistic-concurrency precondition; the
    /// platform rejects the update with a version-conflict error if the
    /// resource has changed since that version was read.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] with category `VersionConflict` on a failed
    /// precondition, `Validation` on a business-rule rejection, or a
    /// transport error otherwise.
    async fn apply_update(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
        expected_version: Version,
        actions: &[UpdateAction],
    ) -> Result<Resource, ClientError>;

    /// Create a resource from a draft.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] with category `Validation` on a
    /// business-rule rejection, or a transport error otherwise.
    async fn create(
        &self,
        resource_type: &ResourceType,
        draft: &ResourceDraft,
    ) -> Result<Resource, ClientError>;

    /// Read a value from the durable key-value store.
    ///
    /// Returns `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport or platform failure.
    async fn get_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<CustomObject>, ClientError>;

    /// Compare-and-set a value in the durable key-value store.
    ///
    /// When `expected_version` is `Some`, succeeds only if the stored
    /// version matches; when `None`, succeeds only if the key is absent.
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] with category `VersionConflict` on a failed
    /// precondition, or a transport error otherwise.
    async fn set_custom_object(
        &self,
        container: &str,
        key: &str,
        value: &serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, ClientError>;
}
