//! Enrichment pipeline: cancellable second-pass derivation of display
//! fields after the initial commit.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use prism_core::context::DerivedFields;
use prism_core::providers::EnrichmentProvider;
use prism_core::subject::Subject;

pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(100);

/// Run the enrichment sub-fetches for one committed subject.
///
/// Waits out the start delay first so rapid subject changes supersede the
/// run before any provider work happens. The token is checked at every
/// await boundary; once it trips, the run returns `None` and nothing it
/// computed is ever committed. Individual sub-fetch failures degrade that
/// field to absent, they never fail the pipeline.
pub async fn run(
    provider: Arc<dyn EnrichmentProvider>,
    subject: Subject,
    cancel: CancellationToken,
    delay: Duration,
) -> Option<DerivedFields> {
    tokio::select! {
        _ = cancel.cancelled() => return None,
        _ = tokio::time::sleep(delay) => {}
    }

    let fetches = async {
        futures::join!(
            provider.format_message(&subject),
            provider.linked_entities(&subject),
            provider.remote_entity(&subject),
        )
    };
    let (message, links, remote) = tokio::select! {
        _ = cancel.cancelled() => return None,
        out = fetches => out,
    };

    let derived = DerivedFields {
        formatted_message: message
            .map_err(|e| tracing::debug!(error = %e, "format sub-fetch failed"))
            .ok(),
        linked_entities: links.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "linked-entity sub-fetch failed");
            Vec::new()
        }),
        remote_entity: remote.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "remote-entity sub-fetch failed");
            None
        }),
    };
    Some(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prism_core::context::{LinkedEntity, RemoteEntity};
    use prism_core::errors::ProviderError;
    use prism_core::subject::SubjectRef;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubEnrichment {
        fail_message: AtomicBool,
        fail_links: AtomicBool,
        slow: Option<Duration>,
    }

    impl StubEnrichment {
        fn new() -> Self {
            Self {
                fail_message: AtomicBool::new(false),
                fail_links: AtomicBool::new(false),
                slow: None,
            }
        }
    }

    #[async_trait]
    impl EnrichmentProvider for StubEnrichment {
        async fn format_message(&self, subject: &Subject) -> Result<String, ProviderError> {
            if let Some(d) = self.slow {
                tokio::time::sleep(d).await;
            }
            if self.fail_message.load(Ordering::Relaxed) {
                return Err(ProviderError::Unavailable("formatter down".into()));
            }
            Ok(format!("formatted:{}", subject.payload["message"].as_str().unwrap_or("")))
        }

        async fn linked_entities(&self, _: &Subject) -> Result<Vec<LinkedEntity>, ProviderError> {
            if self.fail_links.load(Ordering::Relaxed) {
                return Err(ProviderError::Lookup("index offline".into()));
            }
            Ok(vec![LinkedEntity {
                id: "#7".into(),
                href: "https://issues.example.com/7".into(),
                title: None,
            }])
        }

        async fn remote_entity(&self, _: &Subject) -> Result<Option<RemoteEntity>, ProviderError> {
            Ok(Some(RemoteEntity {
                provider: "hub".into(),
                id: "42".into(),
                url: "https://hub.example.com/42".into(),
            }))
        }
    }

    fn subject() -> Subject {
        Subject::new(SubjectRef::item("abc"), serde_json::json!({"message": "fix"}))
    }

    #[tokio::test(start_paused = true)]
    async fn successful_run_aggregates_all_fields() {
        let derived = run(
            Arc::new(StubEnrichment::new()),
            subject(),
            CancellationToken::new(),
            DEFAULT_START_DELAY,
        )
        .await
        .unwrap();
        assert_eq!(derived.formatted_message.as_deref(), Some("formatted:fix"));
        assert_eq!(derived.linked_entities.len(), 1);
        assert!(derived.remote_entity.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_delay_returns_none() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = run(
            Arc::new(StubEnrichment::new()),
            subject(),
            cancel,
            DEFAULT_START_DELAY,
        )
        .await;
        assert!(out.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_fetch_returns_none() {
        let mut stub = StubEnrichment::new();
        stub.slow = Some(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::new(stub),
            subject(),
            cancel.clone(),
            Duration::from_millis(100),
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        assert!(task.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_subtask_degrades_that_field_only() {
        let stub = StubEnrichment::new();
        stub.fail_message.store(true, Ordering::Relaxed);
        stub.fail_links.store(true, Ordering::Relaxed);
        let derived = run(
            Arc::new(stub),
            subject(),
            CancellationToken::new(),
            DEFAULT_START_DELAY,
        )
        .await
        .unwrap();
        assert!(derived.formatted_message.is_none());
        assert!(derived.linked_entities.is_empty());
        // the healthy sub-fetch still contributes
        assert!(derived.remote_entity.is_some());
    }
}
