//! UI-facing session notices
//!
//! The session manager publishes these instead of touching any UI
//! directly; a UI layer subscribes and renders them.

use crate::domain::session::value_object::CallPhase;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// What kind of user-facing failure a notice reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeErrorKind {
    /// Device or permission problem while acquiring local capture
    MediaAcquisitionFailed,
    /// Network or negotiation error reported by the signaling adapter
    SignalingFailure,
}

/// Notices published to the UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    /// The local identity is registered and displayable ("your code is …")
    IdentityReady { identity: String, timestamp: i64 },
    /// The call phase machine moved
    StateChanged {
        from: CallPhase,
        to: CallPhase,
        timestamp: i64,
    },
    /// An inbound call awaits an accept/reject decision
    IncomingCallPending { from: String, timestamp: i64 },
    /// A failure requiring explicit user action (retry startup, reset)
    Error {
        kind: NoticeErrorKind,
        message: String,
        timestamp: i64,
    },
}

impl SessionNotice {
    pub fn identity_ready(identity: &str) -> Self {
        Self::IdentityReady {
            identity: identity.to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn state_changed(from: CallPhase, to: CallPhase) -> Self {
        Self::StateChanged {
            from,
            to,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn incoming_call(from: &str) -> Self {
        Self::IncomingCallPending {
            from: from.to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn error(kind: NoticeErrorKind, message: &str) -> Self {
        Self::Error {
            kind,
            message: message.to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Notice broadcaster
pub struct NoticeBroadcaster {
    tx: broadcast::Sender<SessionNotice>,
}

impl NoticeBroadcaster {
    /// Create a broadcaster with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to session notices
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.tx.subscribe()
    }

    /// Publish a notice. A missing subscriber is not an error; the UI
    /// may attach later.
    pub fn publish(&self, notice: SessionNotice) {
        match self.tx.send(notice) {
            Ok(receivers) => debug!(receivers, "notice published"),
            Err(_) => debug!("notice dropped, no subscribers"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NoticeBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_serialization() {
        let notice = SessionNotice::state_changed(CallPhase::Idle, CallPhase::Dialing);
        let json = serde_json::to_value(&notice).unwrap();

        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["from"], "idle");
        assert_eq!(json["to"], "dialing");
    }

    #[test]
    fn test_error_notice_serialization() {
        let notice = SessionNotice::error(NoticeErrorKind::SignalingFailure, "server gone");
        let json = serde_json::to_value(&notice).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "signaling_failure");
        assert_eq!(json["message"], "server gone");
    }

    #[test]
    fn test_broadcast_reaches_subscriber() {
        let broadcaster = NoticeBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(SessionNotice::identity_ready("03ab"));

        match tokio_test::block_on(rx.recv()).unwrap() {
            SessionNotice::IdentityReady { identity, .. } => assert_eq!(identity, "03ab"),
            other => panic!("unexpected notice: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let broadcaster = NoticeBroadcaster::new(8);
        broadcaster.publish(SessionNotice::identity_ready("03ab"));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
