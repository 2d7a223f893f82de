//! Reference resolution: rewriting embedded id references to stable keys.

use std::collections::HashMap;

use catsync_types::error::ClientError;
use catsync_types::resource::{
    Reference, ReferenceTarget, Resource, ResourceDraft, ResourceKey, ResourceType,
};

use crate::client::{PlatformClient, QueryFilter};
use crate::paginator::Paginator;

/// A reference that could not be rewritten to a key.
///
/// Marks the owning resource as skipped; it never aborts the page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unresolvable {type_id} reference '{id}' on resource '{resource_key}'")]
pub struct ResolveError {
    pub type_id: String,
    pub id: String,
    pub resource_key: ResourceKey,
}

/// Per-run id→key lookup table for referenced entity types.
///
/// Built once per run by paging the source collections of every referenced
/// type, then consulted for each raw resource. The table is discarded at
/// run end; resolution itself is pure.
pub struct ReferenceResolver {
    keys_by_id: HashMap<(String, String), ResourceKey>,
}

impl ReferenceResolver {
    /// Build the lookup table from the source instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if paging any referenced collection fails
    /// after bounded retries.
    pub async fn build(
        client: &dyn PlatformClient,
        referenced_types: &[ResourceType],
        page_size: u32,
        max_retries: u32,
    ) -> Result<Self, ClientError> {
        let mut keys_by_id = HashMap::new();
        for resource_type in referenced_types {
            let mut paginator = Paginator::new(
                client,
                resource_type.clone(),
                QueryFilter::full(page_size),
                max_retries,
            );
            let mut entries = 0usize;
            while let Some(items) = paginator.next_page().await? {
                for item in items {
                    keys_by_id.insert(
                        (resource_type.as_str().to_owned(), item.id.as_str().to_owned()),
                        item.key,
                    );
                    entries += 1;
                }
            }
            tracing::debug!(
                resource_type = resource_type.as_str(),
                entries,
                "Built reference key table"
            );
        }
        Ok(Self { keys_by_id })
    }

    /// Construct a resolver from an existing table (for tests).
    #[must_use]
    pub fn from_table(keys_by_id: HashMap<(String, String), ResourceKey>) -> Self {
        Self { keys_by_id }
    }

    /// Produce an immutable draft with all embedded references in key form.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] naming the first unresolvable reference.
    pub fn resolve(&self, raw: &Resource) -> Result<ResourceDraft, ResolveError> {
        let product_type = raw
            .product_type
            .as_ref()
            .map(|reference| self.resolve_reference(reference, &raw.key))
            .transpose()?;
        let categories = raw
            .categories
            .iter()
            .map(|reference| self.resolve_reference(reference, &raw.key))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResourceDraft {
            key: raw.key.clone(),
            resource_type: raw.resource_type.clone(),
            name: raw.name.clone(),
            slug: raw.slug.clone(),
            description: raw.description.clone(),
            product_type,
            categories,
            attributes: raw.attributes.clone(),
            variants: raw.variants.clone(),
        })
    }

    fn resolve_reference(
        &self,
        reference: &Reference,
        owner: &ResourceKey,
    ) -> Result<Reference, ResolveError> {
        match &reference.target {
            // Already stable; pass through unchanged.
            ReferenceTarget::Key(_) => Ok(reference.clone()),
            ReferenceTarget::Id(id) => self
                .keys_by_id
                .get(&(reference.type_id.clone(), id.clone()))
                .map(|key| Reference::by_key(reference.type_id.clone(), key.as_str()))
                .ok_or_else(|| ResolveError {
                    type_id: reference.type_id.clone(),
                    id: id.clone(),
                    resource_key: owner.clone(),
                }),
        }
    }
}
