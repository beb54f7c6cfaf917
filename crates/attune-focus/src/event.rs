//! Internal completion events.

use std::time::Duration;

use attune_types::{FocusSessionId, FocusStatus, Timestamp, Trigger};

/// A session reached a terminal status.
///
/// Emitted by the manager for every finished session, with or without a
/// vendor identity. The outbound [`Trigger`] is derived from it only when
/// the session has somewhere to notify.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFinished {
    /// Key the session ran under.
    pub identity: String,
    /// Notification address; empty means nobody is notified.
    pub vendor_identity: String,
    pub session_id: FocusSessionId,
    pub status: FocusStatus,
    /// Requested length of the session.
    pub duration: Duration,
    pub ended_at: Timestamp,
}

impl SessionFinished {
    /// The `FinishSession` trigger for the notification boundary, `None`
    /// when the session has no vendor identity.
    pub fn trigger(&self) -> Option<Trigger> {
        if self.vendor_identity.is_empty() {
            return None;
        }
        Some(Trigger::finish_session(
            self.vendor_identity.clone(),
            self.session_id,
            self.status,
            self.ended_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attune_types::{TriggerKind, now};

    fn finished(vendor: &str) -> SessionFinished {
        SessionFinished {
            identity: "u1".to_string(),
            vendor_identity: vendor.to_string(),
            session_id: FocusSessionId::new(),
            status: FocusStatus::Stopped,
            duration: Duration::from_secs(60),
            ended_at: now(),
        }
    }

    #[test]
    fn test_trigger_addresses_vendor() {
        let event = finished("chat-1");
        let trigger = event.trigger().unwrap();
        assert_eq!(trigger.identity, "chat-1");
        assert_eq!(trigger.kind, TriggerKind::FinishSession);
        assert_eq!(trigger.status, FocusStatus::Stopped);
        assert_eq!(trigger.session_id, event.session_id);
        assert_eq!(trigger.ended_at, event.ended_at);
    }

    #[test]
    fn test_no_trigger_without_vendor() {
        assert_eq!(finished("").trigger(), None);
    }
}
