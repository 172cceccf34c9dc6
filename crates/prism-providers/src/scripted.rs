use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use prism_core::context::LiveStatus;
use prism_core::errors::ProviderError;
use prism_core::ids::ResourceId;
use prism_core::providers::SubjectProvider;
use prism_core::subject::{Subject, SubjectRef};

/// Subject provider backed by pre-loaded records — the deterministic stand-in
/// for a real record/resource backend. Every answer is scripted up front and
/// can be swapped mid-test; call counters let tests assert what the engine
/// actually asked for.
#[derive(Default)]
pub struct ScriptedSubjects {
    state: Mutex<State>,
    fail_lookups: AtomicBool,
    resolve_calls: AtomicUsize,
    best_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

#[derive(Default)]
struct State {
    subjects: HashMap<SubjectRef, Subject>,
    best: Option<Subject>,
    status: Option<LiveStatus>,
    resource: Option<ResourceId>,
}

impl ScriptedSubjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a subject so `resolve` can find it by identity.
    pub fn load(&self, subject: Subject) {
        self.state
            .lock()
            .subjects
            .insert(subject.id.clone(), subject);
    }

    pub fn set_best(&self, subject: Option<Subject>) {
        if let Some(s) = &subject {
            self.load(s.clone());
        }
        self.state.lock().best = subject;
    }

    pub fn set_status(&self, status: Option<LiveStatus>) {
        self.state.lock().status = status;
    }

    pub fn set_resource(&self, resource: Option<ResourceId>) {
        self.state.lock().resource = resource;
    }

    /// Make every lookup fail until cleared.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::Relaxed);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::Relaxed)
    }

    pub fn best_calls(&self) -> usize {
        self.best_calls.load(Ordering::Relaxed)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::Relaxed)
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        if self.fail_lookups.load(Ordering::Relaxed) {
            Err(ProviderError::Unavailable("scripted failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubjectProvider for ScriptedSubjects {
    async fn resolve(&self, subject: &SubjectRef) -> Result<Option<Subject>, ProviderError> {
        self.resolve_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        Ok(self.state.lock().subjects.get(subject).cloned())
    }

    async fn best_subject(&self) -> Result<Option<Subject>, ProviderError> {
        self.best_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        Ok(self.state.lock().best.clone())
    }

    async fn live_status(
        &self,
        _resource: Option<&ResourceId>,
    ) -> Result<Option<LiveStatus>, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        Ok(self.state.lock().status.clone())
    }

    fn best_resource(&self) -> Option<ResourceId> {
        self.state.lock().resource.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject(token: &str) -> Subject {
        Subject::new(SubjectRef::item(token), json!({"message": token}))
    }

    #[tokio::test]
    async fn resolve_finds_loaded_subjects() {
        let provider = ScriptedSubjects::new();
        provider.load(subject("abc"));

        let found = provider.resolve(&SubjectRef::item("abc")).await.unwrap();
        assert_eq!(found.unwrap().id, SubjectRef::item("abc"));

        let missing = provider.resolve(&SubjectRef::item("zzz")).await.unwrap();
        assert!(missing.is_none());
        assert_eq!(provider.resolve_calls(), 2);
    }

    #[tokio::test]
    async fn set_best_also_loads() {
        let provider = ScriptedSubjects::new();
        provider.set_best(Some(subject("abc")));

        let best = provider.best_subject().await.unwrap().unwrap();
        assert_eq!(best.id, SubjectRef::item("abc"));
        // navigable by identity too
        assert!(provider
            .resolve(&SubjectRef::item("abc"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn failure_switch_poisons_all_lookups() {
        let provider = ScriptedSubjects::new();
        provider.load(subject("abc"));
        provider.set_fail_lookups(true);

        assert!(provider.resolve(&SubjectRef::item("abc")).await.is_err());
        assert!(provider.best_subject().await.is_err());
        assert!(provider.live_status(None).await.is_err());

        provider.set_fail_lookups(false);
        assert!(provider.resolve(&SubjectRef::item("abc")).await.is_ok());
    }

    #[tokio::test]
    async fn status_is_scripted() {
        let provider = ScriptedSubjects::new();
        assert!(provider.live_status(None).await.unwrap().is_none());

        provider.set_status(Some(LiveStatus {
            snapshot: json!({"dirty": true}),
            branch: Some("main".into()),
            remote_entity: None,
            suggestions: vec![],
        }));
        let status = provider.live_status(None).await.unwrap().unwrap();
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(provider.status_calls(), 2);
    }
}
