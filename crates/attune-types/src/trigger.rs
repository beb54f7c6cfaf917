//! Outbound events announcing session lifecycle changes.

use serde::{Deserialize, Serialize};

use crate::{FocusSessionId, FocusStatus, Timestamp};

/// What a trigger announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// A focus session reached a terminal status.
    FinishSession,
}

/// Event emitted by the lifecycle manager for the notification layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Notification address of the recipient (the session's vendor id).
    pub identity: String,
    pub kind: TriggerKind,
    pub status: FocusStatus,
    /// History record the session run belongs to.
    pub session_id: FocusSessionId,
    pub ended_at: Timestamp,
}

impl Trigger {
    /// A `FinishSession` trigger for the given terminal status.
    pub fn finish_session(
        identity: impl Into<String>,
        session_id: FocusSessionId,
        status: FocusStatus,
        ended_at: Timestamp,
    ) -> Self {
        Self {
            identity: identity.into(),
            kind: TriggerKind::FinishSession,
            status,
            session_id,
            ended_at,
        }
    }
}
