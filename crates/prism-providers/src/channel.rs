//! Channel-backed plumbing: an in-process transport, a manually fired
//! resource watcher, an in-memory preference store, and a recording action
//! delegate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use prism_core::commands::{DraftKind, FileActionKind, RepoActionKind};
use prism_core::errors::{ProviderError, TransportError};
use prism_core::ids::ResourceId;
use prism_core::notify::{Notification, Transport};
use prism_core::providers::{
    ActionDelegate, PreferenceStore, ResourceWatcher, WatchEvent, WatchHandle,
};

/// Transport that forwards notifications over an unbounded channel. The
/// receiving half is the "display surface" (the host's stdout pump, or a
/// test's assertion loop).
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Notification>,
    fail_sends: AtomicBool,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                fail_sends: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Make `notify` report failure (dropping the notification) until
    /// cleared. Lets tests exercise the log-and-swallow path.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn notify(&self, notification: Notification) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::Send("scripted transport failure".into()));
        }
        self.tx
            .send(notification)
            .map_err(|_| TransportError::Closed)
    }
}

struct IssuedWatch {
    resource: ResourceId,
    token: CancellationToken,
    events: mpsc::Sender<WatchEvent>,
}

/// Resource watcher fired by hand. Real deployments plug in a filesystem or
/// index watcher; tests and the demo host fire changes explicitly.
#[derive(Default)]
pub struct ManualWatcher {
    watches: Mutex<Vec<IssuedWatch>>,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change notification to every live watch on `resource`.
    pub fn fire(&self, resource: &ResourceId) {
        let watches = self.watches.lock();
        for watch in watches.iter() {
            if watch.resource == *resource && !watch.token.is_cancelled() {
                let _ = watch.events.try_send(WatchEvent {
                    resource: resource.clone(),
                });
            }
        }
    }

    /// Watches registered and not yet disposed.
    pub fn active_count(&self) -> usize {
        self.watches
            .lock()
            .iter()
            .filter(|w| !w.token.is_cancelled())
            .count()
    }

    /// Watches whose handle has been disposed.
    pub fn disposed_count(&self) -> usize {
        self.watches
            .lock()
            .iter()
            .filter(|w| w.token.is_cancelled())
            .count()
    }
}

impl ResourceWatcher for ManualWatcher {
    fn watch(
        &self,
        resource: &ResourceId,
        _debounce: std::time::Duration,
        events: mpsc::Sender<WatchEvent>,
    ) -> WatchHandle {
        let token = CancellationToken::new();
        self.watches.lock().push(IssuedWatch {
            resource: resource.clone(),
            token: token.clone(),
            events,
        });
        WatchHandle::new(token)
    }
}

/// In-memory preference store.
#[derive(Default)]
pub struct MemoryPrefs {
    values: Mutex<Map<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl PreferenceStore for MemoryPrefs {
    fn load_all(&self) -> Result<Map<String, Value>, ProviderError> {
        Ok(self.values.lock().clone())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), ProviderError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.values.lock().insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Action delegate that records every dispatch and can be told to fail.
#[derive(Default)]
pub struct RecordingActions {
    recorded: Mutex<Vec<String>>,
    fail_actions: AtomicBool,
    draft_url: Mutex<Option<String>>,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::Relaxed);
    }

    pub fn set_draft_url(&self, url: Option<String>) {
        *self.draft_url.lock() = url;
    }

    pub fn recorded(&self) -> Vec<String> {
        self.recorded.lock().clone()
    }

    fn record(&self, entry: String) -> Result<(), ProviderError> {
        if self.fail_actions.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("action backend down".into()));
        }
        self.recorded.lock().push(entry);
        Ok(())
    }
}

#[async_trait]
impl ActionDelegate for RecordingActions {
    async fn file_action(&self, action: FileActionKind, path: &str) -> Result<(), ProviderError> {
        self.record(format!("file:{action:?}:{path}"))
    }

    async fn repo_action(&self, action: RepoActionKind) -> Result<(), ProviderError> {
        self.record(format!("repo:{action:?}"))
    }

    async fn create_draft(
        &self,
        kind: DraftKind,
        title: Option<&str>,
        _body: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.record(format!("draft:{kind:?}:{}", title.unwrap_or("")))?;
        Ok(self.draft_url.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::context::Context;
    use std::time::Duration;

    #[tokio::test]
    async fn transport_delivers_notifications() {
        let (transport, mut rx) = ChannelTransport::new();
        transport
            .notify(Notification::LiveStatusChanged)
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), Notification::LiveStatusChanged);
    }

    #[tokio::test]
    async fn transport_failure_switch_drops_and_errors() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.set_fail_sends(true);
        let result = transport
            .notify(Notification::DidChangeState {
                context: Context::default(),
            })
            .await;
        assert!(result.is_err());
        assert!(rx.try_recv().is_err());

        transport.set_fail_sends(false);
        transport
            .notify(Notification::LiveStatusChanged)
            .await
            .unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn watcher_fires_only_live_watches_for_resource() {
        let watcher = ManualWatcher::new();
        let (tx, mut rx) = mpsc::channel(8);
        let a = ResourceId::new();
        let b = ResourceId::new();

        let handle_a = watcher.watch(&a, Duration::from_millis(500), tx.clone());
        let _handle_b = watcher.watch(&b, Duration::from_millis(500), tx.clone());
        assert_eq!(watcher.active_count(), 2);

        watcher.fire(&a);
        assert_eq!(rx.recv().await.unwrap().resource, a);
        assert!(rx.try_recv().is_err());

        handle_a.dispose();
        assert_eq!(watcher.active_count(), 1);
        assert_eq!(watcher.disposed_count(), 1);
        watcher.fire(&a);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn memory_prefs_roundtrip() {
        let prefs = MemoryPrefs::new();
        prefs
            .set("files.layout", &serde_json::json!("tree"))
            .unwrap();
        assert_eq!(prefs.get("files.layout"), Some(serde_json::json!("tree")));
        assert_eq!(prefs.load_all().unwrap().len(), 1);
        assert_eq!(prefs.write_count(), 1);
    }

    #[tokio::test]
    async fn actions_record_and_fail_on_demand() {
        let actions = RecordingActions::new();
        actions
            .file_action(FileActionKind::Stage, "src/lib.rs")
            .await
            .unwrap();
        assert_eq!(actions.recorded(), vec!["file:Stage:src/lib.rs"]);

        actions.set_fail_actions(true);
        assert!(actions.repo_action(RepoActionKind::Push).await.is_err());
    }

    #[tokio::test]
    async fn draft_url_is_scripted() {
        let actions = RecordingActions::new();
        actions.set_draft_url(Some("https://drafts.example.com/7".into()));
        let url = actions
            .create_draft(DraftKind::Suggestion, Some("tweak"), "body")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://drafts.example.com/7"));
    }
}
