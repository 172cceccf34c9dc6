use serde::{Deserialize, Serialize};

use crate::ids::{ResourceId, SubjectToken};

/// Identity of the thing currently displayed.
///
/// An `Item` is an immutable record addressed by a stable token; two items
/// are the same subject iff their tokens are equal. A `Live` reference is a
/// moving target that always resolves to the current uncommitted state of a
/// resource, so equality is by resource identity, never by content.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectRef {
    Item { token: SubjectToken },
    Live { resource: ResourceId },
}

impl SubjectRef {
    pub fn item(token: impl Into<String>) -> Self {
        Self::Item {
            token: SubjectToken::from_raw(token),
        }
    }

    pub fn live(resource: ResourceId) -> Self {
        Self::Live { resource }
    }

    pub fn is_item(&self) -> bool {
        matches!(self, Self::Item { .. })
    }

    /// The resource a live reference tracks, if any.
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::Live { resource } => Some(resource),
            Self::Item { .. } => None,
        }
    }
}

/// A resolved subject: identity plus the provider-supplied rich payload.
/// The payload's internal structure belongs to the provider, not the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectRef,
    pub payload: serde_json::Value,
}

impl Subject {
    pub fn new(id: SubjectRef, payload: serde_json::Value) -> Self {
        Self { id, payload }
    }
}
