use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;

use prism_core::context::{LinkedEntity, RemoteEntity};
use prism_core::errors::ProviderError;
use prism_core::providers::EnrichmentProvider;
use prism_core::subject::Subject;

/// Enrichment provider that derives display fields from the subject payload:
/// issue references (`#123`) become linked entities, the message is rendered
/// with inline links, and remote entities come from a scripted lookup table
/// keyed by subject token.
pub struct AutolinkEnrichment {
    pattern: Regex,
    issue_base_url: String,
    remotes: Mutex<HashMap<String, RemoteEntity>>,
    fail_remote: AtomicBool,
}

impl AutolinkEnrichment {
    pub fn new(issue_base_url: impl Into<String>) -> Self {
        Self {
            // '#' followed by digits, not preceded by a word character
            pattern: Regex::new(r"#(\d+)").expect("static pattern"),
            issue_base_url: issue_base_url.into(),
            remotes: Mutex::new(HashMap::new()),
            fail_remote: AtomicBool::new(false),
        }
    }

    /// Associate a remote entity with a subject token.
    pub fn set_remote(&self, token: impl Into<String>, entity: RemoteEntity) {
        self.remotes.lock().insert(token.into(), entity);
    }

    pub fn set_fail_remote(&self, fail: bool) {
        self.fail_remote.store(fail, Ordering::Relaxed);
    }

    fn message_of(subject: &Subject) -> &str {
        subject
            .payload
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
    }

    fn href_for(&self, number: &str) -> String {
        format!("{}/{}", self.issue_base_url.trim_end_matches('/'), number)
    }
}

#[async_trait]
impl EnrichmentProvider for AutolinkEnrichment {
    async fn format_message(&self, subject: &Subject) -> Result<String, ProviderError> {
        let message = Self::message_of(subject);
        let formatted = self
            .pattern
            .replace_all(message, |caps: &regex::Captures<'_>| {
                format!("[#{}]({})", &caps[1], self.href_for(&caps[1]))
            });
        Ok(formatted.into_owned())
    }

    async fn linked_entities(&self, subject: &Subject) -> Result<Vec<LinkedEntity>, ProviderError> {
        let message = Self::message_of(subject);
        let mut seen = Vec::new();
        let mut entities = Vec::new();
        for caps in self.pattern.captures_iter(message) {
            let number = caps[1].to_string();
            if seen.contains(&number) {
                continue;
            }
            entities.push(LinkedEntity {
                id: format!("#{number}"),
                href: self.href_for(&number),
                title: None,
            });
            seen.push(number);
        }
        Ok(entities)
    }

    async fn remote_entity(&self, subject: &Subject) -> Result<Option<RemoteEntity>, ProviderError> {
        if self.fail_remote.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("remote lookup failing".into()));
        }
        let token = match &subject.id {
            prism_core::subject::SubjectRef::Item { token } => token.as_str().to_string(),
            prism_core::subject::SubjectRef::Live { .. } => return Ok(None),
        };
        Ok(self.remotes.lock().get(&token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::subject::SubjectRef;
    use serde_json::json;

    fn subject(token: &str, message: &str) -> Subject {
        Subject::new(SubjectRef::item(token), json!({"message": message}))
    }

    #[tokio::test]
    async fn formats_issue_refs_as_links() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com");
        let formatted = enrich
            .format_message(&subject("abc", "fix #12 and #34"))
            .await
            .unwrap();
        assert_eq!(
            formatted,
            "fix [#12](https://issues.example.com/12) and [#34](https://issues.example.com/34)"
        );
    }

    #[tokio::test]
    async fn extracts_deduplicated_linked_entities() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com/");
        let entities = enrich
            .linked_entities(&subject("abc", "see #7, really #7, also #9"))
            .await
            .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "#7");
        assert_eq!(entities[0].href, "https://issues.example.com/7");
        assert_eq!(entities[1].id, "#9");
    }

    #[tokio::test]
    async fn message_without_refs_passes_through() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com");
        let s = subject("abc", "plain message");
        assert_eq!(enrich.format_message(&s).await.unwrap(), "plain message");
        assert!(enrich.linked_entities(&s).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_entity_lookup_by_token() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com");
        enrich.set_remote(
            "abc",
            RemoteEntity {
                provider: "hub".into(),
                id: "42".into(),
                url: "https://hub.example.com/pull/42".into(),
            },
        );
        let found = enrich
            .remote_entity(&subject("abc", "m"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "42");

        let missing = enrich.remote_entity(&subject("zzz", "m")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn remote_entity_failure_switch() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com");
        enrich.set_fail_remote(true);
        assert!(enrich.remote_entity(&subject("abc", "m")).await.is_err());
    }

    #[tokio::test]
    async fn live_subjects_have_no_remote_entity() {
        let enrich = AutolinkEnrichment::new("https://issues.example.com");
        let live = Subject::new(
            SubjectRef::live(prism_core::ids::ResourceId::new()),
            json!({"message": "wip"}),
        );
        assert!(enrich.remote_entity(&live).await.unwrap().is_none());
    }
}
