//! In-process signaling adapter
//!
//! Routes connect/call/answer/close between endpoints registered on the
//! same hub, delivering the asynchronous events a real signaling server
//! would. Used by the demo binary and the integration tests.

use crate::domain::session::signaling::{SignalingEvent, SignalingPort};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallHandle, ConnectionHandle, PeerIdentity, SessionCode, SessionId, StreamHandle,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A call offered through the hub but not yet answered
struct PendingCall {
    caller: PeerIdentity,
    caller_stream: StreamHandle,
}

#[derive(Default)]
struct HubState {
    endpoints: HashMap<String, mpsc::UnboundedSender<SignalingEvent>>,
    pending_calls: HashMap<Uuid, PendingCall>,
}

/// Shared in-process signaling namespace
#[derive(Default)]
pub struct MemorySignalingHub {
    state: Mutex<HubState>,
}

impl MemorySignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &self,
        identity: &PeerIdentity,
        sender: mpsc::UnboundedSender<SignalingEvent>,
    ) -> Result<()> {
        let mut state = self.lock();
        if state.endpoints.contains_key(identity.as_str()) {
            return Err(DomainError::SignalingFailure(format!(
                "identity '{}' is already registered",
                identity
            )));
        }
        state.endpoints.insert(identity.as_str().to_string(), sender);
        Ok(())
    }

    fn deliver(&self, target: &PeerIdentity, event: SignalingEvent) -> Result<()> {
        let state = self.lock();
        let sender = state.endpoints.get(target.as_str()).ok_or_else(|| {
            DomainError::SignalingFailure(format!("peer '{}' is not registered", target))
        })?;
        sender.send(event).map_err(|_| {
            DomainError::SignalingFailure(format!("peer '{}' is gone", target))
        })
    }

    fn stash_call(&self, call_id: Uuid, caller: PeerIdentity, caller_stream: StreamHandle) {
        self.lock()
            .pending_calls
            .insert(call_id, PendingCall { caller, caller_stream });
    }

    fn take_call(&self, call_id: Uuid) -> Option<(PeerIdentity, StreamHandle)> {
        self.lock()
            .pending_calls
            .remove(&call_id)
            .map(|p| (p.caller, p.caller_stream))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        // Hub state is plain data; a poisoned lock means a panicked test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One endpoint's connection to the hub
pub struct MemorySignaling {
    hub: Arc<MemorySignalingHub>,
    identity: Mutex<Option<PeerIdentity>>,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

impl MemorySignaling {
    /// Create an adapter on `hub`; the returned receiver carries this
    /// endpoint's signaling events
    pub fn attach(
        hub: Arc<MemorySignalingHub>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = Arc::new(Self {
            hub,
            identity: Mutex::new(None),
            events: tx,
        });
        (adapter, rx)
    }

    fn local_identity(&self) -> Result<PeerIdentity> {
        self.identity
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                DomainError::SignalingFailure("adapter is not opened".to_string())
            })
    }
}

#[async_trait]
impl SignalingPort for MemorySignaling {
    async fn open(&self, identity: &PeerIdentity) -> Result<()> {
        self.hub.register(identity, self.events.clone())?;
        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) = Some(identity.clone());

        // Registration acknowledgment, as a real server would send
        let _ = self.events.send(SignalingEvent::Opened(identity.clone()));
        debug!(identity = %identity, "endpoint registered on hub");
        Ok(())
    }

    async fn connect(&self, target: &SessionCode) -> Result<ConnectionHandle> {
        let me = self.local_identity()?;
        let remote = target.as_identity();
        let id = Uuid::new_v4();

        // The remote side sees the same connection labeled with us
        self.hub.deliver(
            &remote,
            SignalingEvent::IncomingConnection(ConnectionHandle::new(id, me)),
        )?;
        Ok(ConnectionHandle::new(id, remote))
    }

    async fn call(
        &self,
        target: &SessionCode,
        local_stream: &StreamHandle,
    ) -> Result<CallHandle> {
        let me = self.local_identity()?;
        let remote = target.as_identity();
        let id = Uuid::new_v4();

        self.hub.stash_call(id, me.clone(), *local_stream);
        if let Err(err) = self
            .hub
            .deliver(&remote, SignalingEvent::IncomingCall(CallHandle::new(id, me)))
        {
            // The offer never reached anyone; do not leave it answerable
            self.hub.take_call(id);
            return Err(err);
        }
        Ok(CallHandle::new(id, remote))
    }

    async fn answer(&self, call: &CallHandle, local_stream: &StreamHandle) -> Result<()> {
        let me = self.local_identity()?;
        let (caller, caller_stream) = self.hub.take_call(call.id()).ok_or_else(|| {
            DomainError::SignalingFailure(format!("call {} is no longer offered", call))
        })?;

        // Caller receives the callee's stream, callee the caller's
        self.hub.deliver(
            &caller,
            SignalingEvent::RemoteStream {
                call: CallHandle::new(call.id(), me),
                stream: *local_stream,
            },
        )?;
        let _ = self.events.send(SignalingEvent::RemoteStream {
            call: call.clone(),
            stream: caller_stream,
        });
        Ok(())
    }

    async fn close_connection(&self, connection: &ConnectionHandle) -> Result<()> {
        let me = self.local_identity()?;
        // Idempotent: the other side may already be gone
        let _ = self.hub.deliver(
            connection.peer(),
            SignalingEvent::RemoteClosed(SessionId::for_remote(&me)),
        );
        Ok(())
    }

    async fn close_call(&self, call: &CallHandle) -> Result<()> {
        let me = self.local_identity()?;
        self.hub.take_call(call.id());
        let _ = self.hub.deliver(
            call.peer(),
            SignalingEvent::RemoteClosed(SessionId::for_remote(&me)),
        );
        Ok(())
    }
}
