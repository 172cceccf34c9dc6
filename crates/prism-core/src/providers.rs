//! External collaborator seams: data providers, resource watching, side
//! actions, preference storage. The engine owns none of these; it only
//! depends on the contracts below.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::commands::{DraftKind, FileActionKind, RepoActionKind};
use crate::context::{LinkedEntity, LiveStatus, RemoteEntity};
use crate::errors::ProviderError;
use crate::ids::ResourceId;
use crate::subject::{Subject, SubjectRef};

/// Resolves subjects and live-resource snapshots.
#[async_trait]
pub trait SubjectProvider: Send + Sync {
    /// Resolve a subject identity to its full payload. `Ok(None)` means the
    /// identity no longer resolves (e.g. the record was pruned).
    async fn resolve(&self, subject: &SubjectRef) -> Result<Option<Subject>, ProviderError>;

    /// The current "best" subject for focused mode (what an ambient refresh
    /// re-selects).
    async fn best_subject(&self) -> Result<Option<Subject>, ProviderError>;

    /// Snapshot the current status of a live resource. `None` resource means
    /// the provider picks its best guess.
    async fn live_status(
        &self,
        resource: Option<&ResourceId>,
    ) -> Result<Option<LiveStatus>, ProviderError>;

    /// Best-guess resource to bind live-status watching to when the caller
    /// supplies no hint.
    fn best_resource(&self) -> Option<ResourceId>;
}

/// Second-pass derivation of display fields. Each method is an independent
/// sub-fetch; failures degrade that field only.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn format_message(&self, subject: &Subject) -> Result<String, ProviderError>;
    async fn linked_entities(&self, subject: &Subject) -> Result<Vec<LinkedEntity>, ProviderError>;
    async fn remote_entity(&self, subject: &Subject) -> Result<Option<RemoteEntity>, ProviderError>;
}

/// Change notification emitted by a resource watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub resource: ResourceId,
}

/// Disposal handle for one resource watch. Cancelling (explicitly or by
/// drop) tells the watcher to stop emitting; cancellation is idempotent.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
}

impl WatchHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn dispose(self) {
        self.token.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Emits change notifications for external resources (filesystem or
/// index-equivalent changes), debounced on the provider side.
pub trait ResourceWatcher: Send + Sync {
    fn watch(
        &self,
        resource: &ResourceId,
        debounce: Duration,
        events: mpsc::Sender<WatchEvent>,
    ) -> WatchHandle;
}

/// Side-action dispatch targets. These are fire-and-observe: failures are
/// surfaced to the user as recoverable notifications, never folded into
/// engine state.
#[async_trait]
pub trait ActionDelegate: Send + Sync {
    async fn file_action(&self, action: FileActionKind, path: &str) -> Result<(), ProviderError>;
    async fn repo_action(&self, action: RepoActionKind) -> Result<(), ProviderError>;

    /// Create a shareable draft or suggestion; returns its URL when the
    /// backend mints one.
    async fn create_draft(
        &self,
        kind: DraftKind,
        title: Option<&str>,
        body: &str,
    ) -> Result<Option<String>, ProviderError>;
}

/// Persisted user preferences. Read once on engine construction; writes are
/// fire-and-forget from the engine's perspective.
pub trait PreferenceStore: Send + Sync {
    fn load_all(&self) -> Result<Map<String, Value>, ProviderError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_handle_dispose_is_idempotent() {
        let token = CancellationToken::new();
        let handle = WatchHandle::new(token.clone());
        assert!(!handle.is_disposed());
        handle.dispose();
        assert!(token.is_cancelled());
        // cancelling an already-cancelled token is a no-op
        token.cancel();
    }

    #[test]
    fn watch_handle_drop_cancels() {
        let token = CancellationToken::new();
        {
            let _handle = WatchHandle::new(token.clone());
        }
        assert!(token.is_cancelled());
    }
}
