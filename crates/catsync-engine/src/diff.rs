//! Diff collaborator seam and the default field-by-field implementation.

use catsync_types::action::UpdateAction;
use catsync_types::resource::{Resource, ResourceDraft};

/// Computes the minimal ordered action list converging a snapshot toward a
/// draft.
///
/// Implementations must be deterministic, and idempotent in the sense that
/// diffing two equivalent inputs returns an empty list — the engine
/// classifies an empty diff as `Unchanged` and will re-derive the list from
/// scratch on every run.
pub trait ActionDiffer: Send + Sync {
    fn diff(&self, draft: &ResourceDraft, snapshot: &Resource) -> Vec<UpdateAction>;
}

/// Default differ: scalar fields, attributes, category membership, and
/// variants by SKU, in a fixed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDiffer;

impl ActionDiffer for FieldDiffer {
    fn diff(&self, draft: &ResourceDraft, snapshot: &Resource) -> Vec<UpdateAction> {
        let mut actions = Vec::new();

        if draft.name != snapshot.name {
            actions.push(UpdateAction::ChangeName {
                name: draft.name.clone(),
            });
        }
        if draft.slug != snapshot.slug {
            actions.push(UpdateAction::ChangeSlug {
                slug: draft.slug.clone(),
            });
        }
        if draft.description != snapshot.description {
            actions.push(UpdateAction::SetDescription {
                description: draft.description.clone(),
            });
        }

        // BTreeMap iteration keeps attribute order deterministic.
        for (name, value) in &draft.attributes {
            if snapshot.attributes.get(name) != Some(value) {
                actions.push(UpdateAction::SetAttribute {
                    name: name.clone(),
                    value: Some(value.clone()),
                });
            }
        }
        for name in snapshot.attributes.keys() {
            if !draft.attributes.contains_key(name) {
                actions.push(UpdateAction::SetAttribute {
                    name: name.clone(),
                    value: None,
                });
            }
        }

        for category in &draft.categories {
            if !snapshot.categories.contains(category) {
                actions.push(UpdateAction::AddToCategory {
                    category: category.clone(),
                });
            }
        }
        for category in &snapshot.categories {
            if !draft.categories.contains(category) {
                actions.push(UpdateAction::RemoveFromCategory {
                    category: category.clone(),
                });
            }
        }

        // Variants correlate by SKU; a changed variant is replaced.
        for variant in &draft.variants {
            match snapshot.variants.iter().find(|v| v.sku == variant.sku) {
                None => actions.push(UpdateAction::AddVariant {
                    variant: variant.clone(),
                }),
                Some(existing) if existing != variant => {
                    actions.push(UpdateAction::RemoveVariant {
                        sku: variant.sku.clone(),
                    });
                    actions.push(UpdateAction::AddVariant {
                        variant: variant.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        for variant in &snapshot.variants {
            if !draft.variants.iter().any(|v| v.sku == variant.sku) {
                actions.push(UpdateAction::RemoveVariant {
                    sku: variant.sku.clone(),
                });
            }
        }

        actions
    }
}
