use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::DraftKind;
use crate::context::Context;
use crate::errors::TransportError;

/// Outbound messages to the display surface: the full-state push plus a few
/// narrow events that don't warrant a full snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    DidChangeState {
        context: Context,
    },
    LiveStatusChanged,
    DraftCreated {
        kind: DraftKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    ActionFailed {
        action: String,
        reason: String,
    },
}

impl Notification {
    pub fn notification_type(&self) -> &'static str {
        match self {
            Self::DidChangeState { .. } => "did_change_state",
            Self::LiveStatusChanged => "live_status_changed",
            Self::DraftCreated { .. } => "draft_created",
            Self::ActionFailed { .. } => "action_failed",
        }
    }
}

/// Outbound half of the display-surface transport.
///
/// Failure is non-fatal by contract: the engine logs and moves on, and a
/// failed push never rolls back committed state.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), TransportError>;
}
