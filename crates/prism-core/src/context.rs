use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::subject::Subject;

/// Which of the two mutually exclusive subject kinds the panel is projecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelMode {
    Focused,
    LiveStatus,
}

/// Queryable navigation indicator state ("position/count").
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationInfo {
    pub count: u32,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// An entity reference extracted from subject text (issue refs and similar).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEntity {
    pub id: String,
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// An associated entity living on a remote service (a PR-like record).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub provider: String,
    pub id: String,
    pub url: String,
}

/// Second-pass fields derived by the enrichment pipeline after the initial
/// commit. All best-effort: a failed sub-fetch leaves its field absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_entities: Vec<LinkedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_entity: Option<RemoteEntity>,
}

impl DerivedFields {
    pub fn is_empty(&self) -> bool {
        self.formatted_message.is_none()
            && self.linked_entities.is_empty()
            && self.remote_entity.is_none()
    }
}

/// A proposed change surfaced alongside the live status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub summary: String,
}

/// Snapshot of a live resource: the moving target projected in
/// `PanelMode::LiveStatus`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub snapshot: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_entity: Option<RemoteEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

/// The authoritative, fully-committed view state.
///
/// Owned exclusively by the panel controller; everything outside the
/// controller treats a `Context` as read-only. Mutation happens only by
/// folding a committed `ContextDelta`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub mode: PanelMode,
    pub navigation: NavigationInfo,
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub preferences: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    pub rich_data_loaded: bool,
    #[serde(default, skip_serializing_if = "DerivedFields::is_empty")]
    pub derived: DerivedFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_status: Option<LiveStatus>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub org_settings: Map<String, Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            mode: PanelMode::Focused,
            navigation: NavigationInfo::default(),
            pinned: false,
            preferences: Map::new(),
            subject: None,
            rich_data_loaded: false,
            derived: DerivedFields::default(),
            live_status: None,
            org_settings: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::SubjectRef;

    #[test]
    fn mode_wire_values() {
        assert_eq!(serde_json::to_string(&PanelMode::Focused).unwrap(), r#""focused""#);
        assert_eq!(
            serde_json::to_string(&PanelMode::LiveStatus).unwrap(),
            r#""live-status""#
        );
    }

    #[test]
    fn default_context_is_unbound_focused() {
        let ctx = Context::default();
        assert_eq!(ctx.mode, PanelMode::Focused);
        assert!(ctx.subject.is_none());
        assert!(!ctx.pinned);
        assert!(!ctx.rich_data_loaded);
        assert!(ctx.derived.is_empty());
    }

    #[test]
    fn derived_fields_emptiness() {
        assert!(DerivedFields::default().is_empty());
        let d = DerivedFields {
            formatted_message: Some("hi".into()),
            ..Default::default()
        };
        assert!(!d.is_empty());
    }

    #[test]
    fn context_serde_roundtrip() {
        let ctx = Context {
            mode: PanelMode::LiveStatus,
            navigation: NavigationInfo {
                count: 3,
                position: 2,
                hint: Some("a1b2c3d4".into()),
            },
            pinned: true,
            subject: Some(Subject::new(
                SubjectRef::item("a1b2c3d4"),
                serde_json::json!({"message": "fix parser"}),
            )),
            rich_data_loaded: true,
            derived: DerivedFields {
                formatted_message: Some("fix parser".into()),
                linked_entities: vec![LinkedEntity {
                    id: "#42".into(),
                    href: "https://issues.example.com/42".into(),
                    title: None,
                }],
                remote_entity: None,
            },
            live_status: Some(LiveStatus {
                snapshot: serde_json::json!({"dirty": true}),
                branch: Some("main".into()),
                remote_entity: None,
                suggestions: vec![],
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&ctx).unwrap();
        let parsed: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, parsed);
    }

    #[test]
    fn empty_collections_are_omitted_from_wire() {
        let ctx = Context::default();
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("preferences"));
        assert!(!json.contains("org_settings"));
        assert!(!json.contains("derived"));
    }
}
