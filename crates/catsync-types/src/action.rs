//! Update actions: atomic mutations applied to a target resource.

use serde::{Deserialize, Serialize};

use crate::resource::{Reference, Variant};

/// One atomic mutation of a target resource.
///
/// Order within an action list is significant; the platform applies actions
/// sequentially. The serialized form carries the action name in an `action`
/// tag, matching the platform's update wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UpdateAction {
    ChangeName { name: String },
    ChangeSlug { slug: Option<String> },
    SetDescription { description: Option<String> },
    SetAttribute {
        name: String,
        /// `None` removes the attribute.
        value: Option<serde_json::Value>,
    },
    AddVariant { variant: Variant },
    RemoveVariant { sku: String },
    AddToCategory { category: Reference },
    RemoveFromCategory { category: Reference },
    /// Make the staged state the publicly visible state.
    Publish,
    /// Withdraw the resource from public visibility.
    Unpublish,
}

impl UpdateAction {
    /// Whether this action toggles published visibility.
    ///
    /// Deliberately a narrow match on `Publish` and `Unpublish` only; actions
    /// that might imply publication as a side effect do not count.
    #[must_use]
    pub fn is_publish_toggle(&self) -> bool {
        matches!(self, Self::Publish | Self::Unpublish)
    }
}
