//! Call attempt entity

use crate::domain::session::value_object::CallRole;
use crate::domain::shared::value_objects::{
    CallHandle, ConnectionHandle, PeerIdentity, SessionId, StreamHandle,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logical call attempt between this endpoint and a remote peer.
///
/// At most one attempt is alive at a time; it is created when a call is
/// placed or an inbound call arrives, and dropped on hang-up, rejection
/// or failure. The handles it carries are borrowed from the adapters;
/// lifecycle authority stays with the session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
    session_id: SessionId,
    role: CallRole,
    remote: PeerIdentity,
    call: Option<CallHandle>,
    data_channel: Option<ConnectionHandle>,
    local_stream: Option<StreamHandle>,
    remote_stream: Option<StreamHandle>,
    started_at: DateTime<Utc>,
    connected_at: Option<DateTime<Utc>>,
}

impl CallAttempt {
    /// A call this endpoint placed by entering a sharing code
    pub fn outbound(
        remote: PeerIdentity,
        local_stream: StreamHandle,
        call: CallHandle,
        data_channel: ConnectionHandle,
    ) -> Self {
        Self {
            session_id: SessionId::for_remote(&remote),
            role: CallRole::Caller,
            remote,
            call: Some(call),
            data_channel: Some(data_channel),
            local_stream: Some(local_stream),
            remote_stream: None,
            started_at: Utc::now(),
            connected_at: None,
        }
    }

    /// A call delivered to this endpoint by the signaling adapter
    pub fn inbound(
        remote: PeerIdentity,
        local_stream: StreamHandle,
        call: CallHandle,
        data_channel: Option<ConnectionHandle>,
    ) -> Self {
        Self {
            session_id: SessionId::for_remote(&remote),
            role: CallRole::Callee,
            remote,
            call: Some(call),
            data_channel,
            local_stream: Some(local_stream),
            remote_stream: None,
            started_at: Utc::now(),
            connected_at: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn role(&self) -> CallRole {
        self.role
    }

    pub fn remote(&self) -> &PeerIdentity {
        &self.remote
    }

    pub fn call(&self) -> Option<&CallHandle> {
        self.call.as_ref()
    }

    pub fn data_channel(&self) -> Option<&ConnectionHandle> {
        self.data_channel.as_ref()
    }

    pub fn local_stream(&self) -> Option<StreamHandle> {
        self.local_stream
    }

    pub fn remote_stream(&self) -> Option<StreamHandle> {
        self.remote_stream
    }

    /// True when `call` refers to this attempt's call. Used as the
    /// stale-event guard for asynchronously delivered adapter events.
    pub fn is_current_call(&self, call: &CallHandle) -> bool {
        self.call.as_ref().map(CallHandle::id) == Some(call.id())
    }

    pub fn set_data_channel(&mut self, channel: ConnectionHandle) {
        self.data_channel = Some(channel);
    }

    pub fn attach_remote_stream(&mut self, stream: StreamHandle) {
        self.remote_stream = Some(stream);
        if self.connected_at.is_none() {
            self.connected_at = Some(Utc::now());
        }
    }

    pub fn mark_connected(&mut self) {
        if self.connected_at.is_none() {
            self.connected_at = Some(Utc::now());
        }
    }

    /// Detach both borrowed stream handles. Done when the attempt ends so
    /// a recycled session starts clean.
    pub fn release_streams(&mut self) {
        self.local_stream = None;
        self.remote_stream = None;
    }

    pub fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    pub fn connected_at(&self) -> Option<&DateTime<Utc>> {
        self.connected_at.as_ref()
    }

    /// Talk time, if the call was ever connected
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.connected_at.map(|connected| Utc::now() - connected)
    }
}
