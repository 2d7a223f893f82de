//! In-memory fake platform for engine integration tests.
//!
//! Holds resources and custom objects in hash maps, enforces real
//! compare-and-set semantics on both, and records calls so tests can assert
//! on submitted actions, refetch counts, and checkpoint write history.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use catsync_engine::client::{CustomObject, PlatformClient, QueryFilter, ResourcePage};
use catsync_types::action::UpdateAction;
use catsync_types::error::ClientError;
use catsync_types::resource::{
    PageCursor, Reference, Resource, ResourceDraft, ResourceId, ResourceKey, ResourceType,
    Version,
};

#[derive(Default)]
pub struct MemoryPlatform {
    resources: Mutex<HashMap<(String, String), Resource>>,
    custom_objects: Mutex<HashMap<(String, String), (serde_json::Value, u64)>>,
    /// Every value written through `set_custom_object`, in order.
    pub checkpoint_writes: Mutex<Vec<serde_json::Value>>,
    scripted_update_failures: Mutex<HashMap<String, VecDeque<ClientError>>>,
    fetch_by_key_calls: Mutex<HashMap<String, u32>>,
    submitted_updates: Mutex<HashMap<String, Vec<Vec<UpdateAction>>>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource: Resource) {
        self.resources.lock().unwrap().insert(
            (
                resource.resource_type.as_str().to_owned(),
                resource.key.as_str().to_owned(),
            ),
            resource,
        );
    }

    pub fn get(&self, resource_type: &str, key: &str) -> Option<Resource> {
        self.resources
            .lock()
            .unwrap()
            .get(&(resource_type.to_owned(), key.to_owned()))
            .cloned()
    }

    pub fn resource_count(&self, resource_type: &str) -> usize {
        self.resources
            .lock()
            .unwrap()
            .keys()
            .filter(|(rt, _)| rt == resource_type)
            .count()
    }

    pub fn fail_next_update(&self, key: &str, error: ClientError) {
        self.scripted_update_failures
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .push_back(error);
    }

    pub fn fetch_by_key_count(&self, key: &str) -> u32 {
        self.fetch_by_key_calls
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn submitted_updates(&self, key: &str) -> Vec<Vec<UpdateAction>> {
        self.submitted_updates
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn custom_object_count(&self) -> usize {
        self.custom_objects.lock().unwrap().len()
    }
}

fn apply_actions(resource: &mut Resource, actions: &[UpdateAction]) {
    for action in actions {
        match action {
            UpdateAction::ChangeName { name } => resource.name = name.clone(),
            UpdateAction::ChangeSlug { slug } => resource.slug = slug.clone(),
            UpdateAction::SetDescription { description } => {
                resource.description = description.clone();
            }
            UpdateAction::SetAttribute { name, value } => match value {
                Some(value) => {
                    resource.attributes.insert(name.clone(), value.clone());
                }
                None => {
                    resource.attributes.remove(name);
                }
            },
            UpdateAction::AddVariant { variant } => resource.variants.push(variant.clone()),
            UpdateAction::RemoveVariant { sku } => {
                resource.variants.retain(|v| &v.sku != sku);
            }
            UpdateAction::AddToCategory { category } => {
                resource.categories.push(category.clone());
            }
            UpdateAction::RemoveFromCategory { category } => {
                resource.categories.retain(|c| c != category);
            }
            UpdateAction::Publish => resource.published = true,
            UpdateAction::Unpublish => resource.published = false,
        }
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn fetch_page(
        &self,
        resource_type: &ResourceType,
        filter: &QueryFilter,
        cursor: Option<&PageCursor>,
    ) -> Result<ResourcePage, ClientError> {
        let resources = self.resources.lock().unwrap();
        let mut matching: Vec<Resource> = resources
            .values()
            .filter(|r| r.resource_type == *resource_type)
            .filter(|r| filter.modified_since.is_none_or(|since| r.last_modified >= since))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.key.cmp(&b.key))
        });

        let offset = cursor.map_or(0, |c| c.as_str().parse::<usize>().unwrap());
        let page_size = filter.page_size as usize;
        let end = usize::min(offset + page_size, matching.len());
        let items = matching[offset..end].to_vec();
        let next_cursor = (end < matching.len()).then(|| PageCursor::new(end.to_string()));
        Ok(ResourcePage { items, next_cursor })
    }

    async fn fetch_by_key(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
    ) -> Result<Option<Resource>, ClientError> {
        *self
            .fetch_by_key_calls
            .lock()
            .unwrap()
            .entry(key.as_str().to_owned())
            .or_insert(0) += 1;
        Ok(self
            .resources
            .lock()
            .unwrap()
            .get(&(resource_type.as_str().to_owned(), key.as_str().to_owned()))
            .cloned())
    }

    async fn apply_update(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
        expected_version: Version,
        actions: &[UpdateAction],
    ) -> Result<Resource, ClientError> {
        self.submitted_updates
            .lock()
            .unwrap()
            .entry(key.as_str().to_owned())
            .or_default()
            .push(actions.to_vec());

        if let Some(scripted) = self
            .scripted_update_failures
            .lock()
            .unwrap()
            .get_mut(key.as_str())
            .and_then(VecDeque::pop_front)
        {
            return Err(scripted);
        }

        let mut resources = self.resources.lock().unwrap();
        let entry = resources
            .get_mut(&(resource_type.as_str().to_owned(), key.as_str().to_owned()))
            .ok_or_else(|| ClientError::internal("MISSING", format!("no resource '{key}'")))?;
        if entry.version != expected_version {
            return Err(ClientError::version_conflict(
                "CONCURRENT_MODIFICATION",
                format!(
                    "expected version {expected_version}, current is {}",
                    entry.version
                ),
            ));
        }
        apply_actions(entry, actions);
        entry.version = Version::new(entry.version.value() + 1);
        entry.last_modified = Utc::now();
        Ok(entry.clone())
    }

    async fn create(
        &self,
        resource_type: &ResourceType,
        draft: &ResourceDraft,
    ) -> Result<Resource, ClientError> {
        let mut resources = self.resources.lock().unwrap();
        let map_key = (
            resource_type.as_str().to_owned(),
            draft.key.as_str().to_owned(),
        );
        if resources.contains_key(&map_key) {
            return Err(ClientError::validation(
                "DUPLICATE_KEY",
                format!("resource '{}' already exists", draft.key),
            ));
        }
        let resource = Resource {
            id: ResourceId::new(format!("id-{}", draft.key)),
            key: draft.key.clone(),
            version: Version::new(1),
            resource_type: resource_type.clone(),
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
            published: false,
            product_type: draft.product_type.clone(),
            categories: draft.categories.clone(),
            attributes: draft.attributes.clone(),
            variants: draft.variants.clone(),
            last_modified: Utc::now(),
        };
        resources.insert(map_key, resource.clone());
        Ok(resource)
    }

    async fn get_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<CustomObject>, ClientError> {
        Ok(self
            .custom_objects
            .lock()
            .unwrap()
            .get(&(container.to_owned(), key.to_owned()))
            .map(|(value, version)| CustomObject {
                container: container.to_owned(),
                key: key.to_owned(),
                value: value.clone(),
                version: *version,
            }))
    }

    async fn set_custom_object(
        &self,
        container: &str,
        key: &str,
        value: &serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, ClientError> {
        let mut objects = self.custom_objects.lock().unwrap();
        let map_key = (container.to_owned(), key.to_owned());
        let current = objects.get(&map_key).map(|(_, version)| *version);
        let new_version = match (expected_version, current) {
            (None, None) => 1,
            (Some(expected), Some(current)) if expected == current => current + 1,
            _ => {
                return Err(ClientError::version_conflict(
                    "CONCURRENT_MODIFICATION",
                    format!("custom object {container}/{key} version mismatch"),
                ))
            }
        };
        objects.insert(map_key, (value.clone(), new_version));
        self.checkpoint_writes.lock().unwrap().push(value.clone());
        Ok(new_version)
    }
}

/// A source product referencing category `category_id` by id.
pub fn source_product(key: &str, name: &str, last_modified: DateTime<Utc>) -> Resource {
    Resource {
        id: ResourceId::new(format!("id-{key}")),
        key: ResourceKey::new(key),
        version: Version::new(1),
        resource_type: ResourceType::new("product"),
        name: name.into(),
        slug: None,
        description: None,
        published: true,
        product_type: None,
        categories: Vec::new(),
        attributes: BTreeMap::new(),
        variants: Vec::new(),
        last_modified,
    }
}

pub fn with_category(mut resource: Resource, reference: Reference) -> Resource {
    resource.categories.push(reference);
    resource
}

/// A category resource usable as a reference-resolution target.
pub fn source_category(id: &str, key: &str, last_modified: DateTime<Utc>) -> Resource {
    Resource {
        id: ResourceId::new(id),
        key: ResourceKey::new(key),
        version: Version::new(1),
        resource_type: ResourceType::new("category"),
        name: key.to_uppercase(),
        slug: None,
        description: None,
        published: false,
        product_type: None,
        categories: Vec::new(),
        attributes: BTreeMap::new(),
        variants: Vec::new(),
        last_modified,
    }
}
