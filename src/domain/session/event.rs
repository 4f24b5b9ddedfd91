//! Session domain events

use crate::domain::session::value_object::{CallRole, EndReason};
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::{PeerIdentity, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base struct for all session events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEventBase {
    pub metadata: EventMetadata,
    /// The local endpoint the event belongs to
    pub peer: PeerIdentity,
}

impl SessionEventBase {
    pub fn new(event_type: &str, peer: PeerIdentity) -> Self {
        Self {
            metadata: EventMetadata::new(event_type),
            peer,
        }
    }
}

/// Local capture acquired; the endpoint can place and receive calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReady {
    pub base: SessionEventBase,
}

impl DomainEvent for MediaReady {
    fn event_type(&self) -> &'static str {
        "session.media_ready"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// An outbound call was placed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialed {
    pub base: SessionEventBase,
    pub session_id: SessionId,
    pub remote: PeerIdentity,
}

impl DomainEvent for Dialed {
    fn event_type(&self) -> &'static str {
        "session.dialed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// An inbound call arrived and awaits the accept/reject decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingingIn {
    pub base: SessionEventBase,
    pub session_id: SessionId,
    pub remote: PeerIdentity,
}

impl DomainEvent for RingingIn {
    fn event_type(&self) -> &'static str {
        "session.ringing_in"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// The call was answered and is connected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConnected {
    pub base: SessionEventBase,
    pub session_id: SessionId,
    pub role: CallRole,
}

impl DomainEvent for CallConnected {
    fn event_type(&self) -> &'static str {
        "session.connected"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// The remote media stream was attached to this endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamAttached {
    pub base: SessionEventBase,
    pub session_id: SessionId,
}

impl DomainEvent for StreamAttached {
    fn event_type(&self) -> &'static str {
        "session.stream_attached"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// The call attempt ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEnded {
    pub base: SessionEventBase,
    pub session_id: SessionId,
    pub reason: EndReason,
    pub duration_seconds: Option<i64>,
}

impl DomainEvent for CallEnded {
    fn event_type(&self) -> &'static str {
        "session.ended"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// The endpoint entered the failed phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faulted {
    pub base: SessionEventBase,
    pub message: String,
}

impl DomainEvent for Faulted {
    fn event_type(&self) -> &'static str {
        "session.faulted"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Union of all session events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    MediaReady(MediaReady),
    Dialed(Dialed),
    RingingIn(RingingIn),
    Connected(CallConnected),
    StreamAttached(StreamAttached),
    Ended(CallEnded),
    Faulted(Faulted),
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::MediaReady(e) => e.event_type(),
            SessionEvent::Dialed(e) => e.event_type(),
            SessionEvent::RingingIn(e) => e.event_type(),
            SessionEvent::Connected(e) => e.event_type(),
            SessionEvent::StreamAttached(e) => e.event_type(),
            SessionEvent::Ended(e) => e.event_type(),
            SessionEvent::Faulted(e) => e.event_type(),
        }
    }

    pub fn peer(&self) -> &PeerIdentity {
        match self {
            SessionEvent::MediaReady(e) => &e.base.peer,
            SessionEvent::Dialed(e) => &e.base.peer,
            SessionEvent::RingingIn(e) => &e.base.peer,
            SessionEvent::Connected(e) => &e.base.peer,
            SessionEvent::StreamAttached(e) => &e.base.peer,
            SessionEvent::Ended(e) => &e.base.peer,
            SessionEvent::Faulted(e) => &e.base.peer,
        }
    }
}
