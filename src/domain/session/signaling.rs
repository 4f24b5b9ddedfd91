//! Signaling port

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallHandle, ConnectionHandle, PeerIdentity, SessionCode, SessionId, StreamHandle,
};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Port to the external signaling network.
///
/// Defined in the domain layer as a trait (port) and implemented in the
/// infrastructure layer (adapter). Every operation is asynchronous with
/// at-most-once event delivery per logical operation; retries of the
/// underlying negotiation belong to the adapter, not the core.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SignalingPort: Send + Sync {
    /// Register the local identity with the signaling network
    async fn open(&self, identity: &PeerIdentity) -> Result<()>;

    /// Open a data connection to the peer named by `target`
    async fn connect(&self, target: &SessionCode) -> Result<ConnectionHandle>;

    /// Place a media call to `target`, offering the local stream
    async fn call(&self, target: &SessionCode, local_stream: &StreamHandle)
        -> Result<CallHandle>;

    /// Answer an inbound call with the local stream
    async fn answer(&self, call: &CallHandle, local_stream: &StreamHandle) -> Result<()>;

    /// Close a data connection
    async fn close_connection(&self, connection: &ConnectionHandle) -> Result<()>;

    /// Close or decline a call
    async fn close_call(&self, call: &CallHandle) -> Result<()>;
}

/// Asynchronous events delivered by the signaling adapter.
///
/// Fed into the session manager's serialized processing path in arrival
/// order.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// The identity was registered with the signaling server
    Opened(PeerIdentity),
    /// A peer opened a data connection to this endpoint
    IncomingConnection(ConnectionHandle),
    /// A peer placed a call to this endpoint
    IncomingCall(CallHandle),
    /// The remote media stream for a call became available
    RemoteStream {
        call: CallHandle,
        stream: StreamHandle,
    },
    /// The remote peer closed the connection gracefully
    RemoteClosed(SessionId),
    /// The adapter reported a network or negotiation error
    Error(String),
}
