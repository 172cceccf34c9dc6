use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::PanelMode;
use crate::ids::ResourceId;
use crate::subject::SubjectRef;

/// Inbound messages from the display surface.
///
/// Each variant maps 1:1 to one controller or side-action entry point.
/// Unknown or malformed messages fail to deserialize and are dropped by the
/// host with a warning; they never reach the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelCommand {
    SelectSubject {
        subject: SubjectRef,
        #[serde(default)]
        force: bool,
    },
    SwitchMode {
        mode: PanelMode,
        #[serde(default)]
        resource: Option<ResourceId>,
    },
    Navigate {
        direction: NavDirection,
    },
    SetPinned {
        pinned: bool,
    },
    Refresh {
        #[serde(default)]
        force: bool,
    },
    UpdatePreference {
        key: String,
        value: Value,
    },
    RequestEnrichment {
        #[serde(default)]
        force: bool,
    },
    FileAction {
        action: FileActionKind,
        path: String,
    },
    RepoAction {
        action: RepoActionKind,
    },
    CreateDraft {
        kind: DraftKind,
        #[serde(default)]
        title: Option<String>,
        body: String,
    },
}

impl PanelCommand {
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::SelectSubject { .. } => "select_subject",
            Self::SwitchMode { .. } => "switch_mode",
            Self::Navigate { .. } => "navigate",
            Self::SetPinned { .. } => "set_pinned",
            Self::Refresh { .. } => "refresh",
            Self::UpdatePreference { .. } => "update_preference",
            Self::RequestEnrichment { .. } => "request_enrichment",
            Self::FileAction { .. } => "file_action",
            Self::RepoAction { .. } => "repo_action",
            Self::CreateDraft { .. } => "create_draft",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavDirection {
    Back,
    Forward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileActionKind {
    OpenDiff,
    OpenFile,
    Stage,
    Unstage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoActionKind {
    Fetch,
    Push,
    Pull,
    Publish,
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    Draft,
    Suggestion,
}
