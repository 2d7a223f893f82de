//! Update policy hooks and per-resource-type sync strategies.

use std::sync::Arc;

use catsync_types::action::UpdateAction;
use catsync_types::resource::{Resource, ResourceDraft, ResourceType};

/// Domain rule applied to a computed action list before submission.
///
/// Must be pure: its only effect is the returned list, which may be the
/// input unchanged, and may be empty only if the input was empty.
pub type UpdatePolicy =
    Arc<dyn Fn(Vec<UpdateAction>, &ResourceDraft, &Resource) -> Vec<UpdateAction> + Send + Sync>;

/// Publish-staging rule for product updates.
///
/// When a published target product receives staged update actions, a
/// `Publish` action is appended after them so the staged edits become
/// visible atomically. Nothing is appended when the action list is empty,
/// when the target was never published, or when the caller already decided
/// publication explicitly with a `Publish` or `Unpublish` action.
#[must_use]
pub fn append_publish_if_published(
    mut actions: Vec<UpdateAction>,
    _draft: &ResourceDraft,
    target: &Resource,
) -> Vec<UpdateAction> {
    if !actions.is_empty()
        && target.published
        && !actions.iter().any(UpdateAction::is_publish_toggle)
    {
        actions.push(UpdateAction::Publish);
    }
    actions
}

/// Resource-type-specific synchronization behavior, injected into the
/// generic engine as an explicit value.
#[derive(Clone)]
pub struct ResourceStrategy {
    /// The resource collection this strategy synchronizes.
    pub resource_type: ResourceType,
    /// Entity types whose id→key tables the resolver preloads.
    pub referenced_types: Vec<ResourceType>,
    /// Optional policy hook mutating computed action lists.
    pub update_policy: Option<UpdatePolicy>,
}

impl std::fmt::Debug for ResourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStrategy")
            .field("resource_type", &self.resource_type)
            .field("referenced_types", &self.referenced_types)
            .field("update_policy", &self.update_policy.as_ref().map(|_| "fn"))
            .finish()
    }
}

impl ResourceStrategy {
    /// Plain strategy: no reference preloading, no policy hook.
    #[must_use]
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            referenced_types: Vec::new(),
            update_policy: None,
        }
    }

    /// Preload id→key tables for the given referenced entity types.
    #[must_use]
    pub fn with_referenced_types(mut self, referenced_types: Vec<ResourceType>) -> Self {
        self.referenced_types = referenced_types;
        self
    }

    /// Install an update policy hook.
    #[must_use]
    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = Some(policy);
        self
    }

    /// Product strategy: resolves product-type and category references and
    /// applies the publish-staging rule.
    #[must_use]
    pub fn products() -> Self {
        Self::new(ResourceType::new("product"))
            .with_referenced_types(vec![
                ResourceType::new("product-type"),
                ResourceType::new("category"),
            ])
            .with_update_policy(Arc::new(append_publish_if_published))
    }

    /// Category strategy: resolves parent-category references, no policy.
    #[must_use]
    pub fn categories() -> Self {
        Self::new(ResourceType::new("category"))
            .with_referenced_types(vec![ResourceType::new("category")])
    }

    /// Strategy for a resource type named in configuration.
    ///
    /// Known names get their specialized strategies; anything else syncs as
    /// a plain resource collection.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            "product" => Self::products(),
            "category" => Self::categories(),
            other => Self::new(ResourceType::new(other)),
        }
    }
}
