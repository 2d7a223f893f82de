//! Sequential page streaming from a platform resource collection.

use catsync_types::error::ClientError;
use catsync_types::resource::{PageCursor, Resource, ResourceType};

use crate::client::{PlatformClient, QueryFilter};
use crate::errors::retry_remote;

/// Lazy, finite, non-restartable stream of resource pages.
///
/// Pages are fetched strictly one after another to respect cursor semantics
/// and preserve ordering for checkpointing. A page fetch that keeps failing
/// after bounded retries aborts iteration with the terminal error — a
/// missing page cannot be skipped without breaking checkpoint monotonicity.
pub struct Paginator<'a> {
    client: &'a dyn PlatformClient,
    resource_type: ResourceType,
    filter: QueryFilter,
    cursor: Option<PageCursor>,
    exhausted: bool,
    max_retries: u32,
}

impl<'a> Paginator<'a> {
    /// Create a paginator over one resource collection.
    #[must_use]
    pub fn new(
        client: &'a dyn PlatformClient,
        resource_type: ResourceType,
        filter: QueryFilter,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            resource_type,
            filter,
            cursor: None,
            exhausted: false,
            max_retries,
        }
    }

    /// Fetch the next non-empty page, or `None` once the collection is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`ClientError`] once bounded retries for a page
    /// fetch are exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Resource>>, ClientError> {
        while !self.exhausted {
            let client = self.client;
            let resource_type = &self.resource_type;
            let filter = &self.filter;
            let cursor = self.cursor.clone();
            let page = retry_remote(self.max_retries, "fetch page", || {
                client.fetch_page(resource_type, filter, cursor.as_ref())
            })
            .await?;

            tracing::debug!(
                resource_type = self.resource_type.as_str(),
                items = page.items.len(),
                has_next = page.next_cursor.is_some(),
                "Fetched source page"
            );

            self.cursor = page.next_cursor;
            if self.cursor.is_none() {
                self.exhausted = true;
            }
            if !page.items.is_empty() {
                return Ok(Some(page.items));
            }
        }
        Ok(None)
    }
}
