//! Peer session aggregate root

use crate::domain::session::attempt::CallAttempt;
use crate::domain::session::event::{
    CallConnected, CallEnded, Dialed, Faulted, MediaReady, RingingIn, SessionEvent,
    SessionEventBase, StreamAttached,
};
use crate::domain::session::value_object::{CallPhase, EndReason, PhaseInput};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallHandle, ConnectionHandle, PeerIdentity, StreamHandle,
};

/// Peer session aggregate root
///
/// Owns the call phase machine, the single current call attempt and the
/// endpoint's acquired local stream. Every mutation goes through the
/// phase transition table first, so illegal commands are rejected before
/// any state changes.
#[derive(Debug, Clone)]
pub struct PeerSession {
    /// The local endpoint's identity, used to label state and events
    identity: PeerIdentity,
    phase: CallPhase,
    /// Acquired local capture, shared between placing and answering calls
    local_stream: Option<StreamHandle>,
    /// Data connection delivered before its call event, held until the
    /// matching inbound call arrives
    pending_connection: Option<ConnectionHandle>,
    attempt: Option<CallAttempt>,
    /// Pending domain events
    events: Vec<SessionEvent>,
}

impl PeerSession {
    pub fn new(identity: PeerIdentity) -> Self {
        Self {
            identity,
            phase: CallPhase::AwaitingLocalMedia,
            local_stream: None,
            pending_connection: None,
            attempt: None,
            events: Vec::new(),
        }
    }

    /// Local capture acquired; the endpoint becomes ready for calls
    pub fn local_media_ready(&mut self, stream: StreamHandle) -> Result<()> {
        self.phase = self.phase.on(PhaseInput::LocalMediaReady)?;
        self.local_stream = Some(stream);

        self.record_event(SessionEvent::MediaReady(MediaReady {
            base: self.event_base("session.media_ready"),
        }));

        Ok(())
    }

    /// Place an outbound call to `remote` using handles already obtained
    /// from the signaling adapter
    pub fn place_call(
        &mut self,
        remote: PeerIdentity,
        call: CallHandle,
        data_channel: ConnectionHandle,
    ) -> Result<()> {
        let local_stream = self.require_local_stream()?;
        self.phase = self.phase.on(PhaseInput::PlaceCall)?;

        let attempt = CallAttempt::outbound(remote.clone(), local_stream, call, data_channel);
        self.record_event(SessionEvent::Dialed(Dialed {
            base: self.event_base("session.dialed"),
            session_id: attempt.session_id().clone(),
            remote,
        }));
        self.attempt = Some(attempt);

        Ok(())
    }

    /// An inbound call arrived. Adopts a pending data connection from the
    /// same peer if one was delivered earlier.
    pub fn inbound_call(&mut self, call: CallHandle) -> Result<()> {
        let local_stream = self.require_local_stream()?;
        self.phase = self.phase.on(PhaseInput::InboundCall)?;

        let remote = call.peer().clone();
        let data_channel = match self.pending_connection.take() {
            Some(conn) if conn.peer() == &remote => Some(conn),
            other => {
                self.pending_connection = other;
                None
            }
        };

        let attempt = CallAttempt::inbound(remote.clone(), local_stream, call, data_channel);
        self.record_event(SessionEvent::RingingIn(RingingIn {
            base: self.event_base("session.ringing_in"),
            session_id: attempt.session_id().clone(),
            remote,
        }));
        self.attempt = Some(attempt);

        Ok(())
    }

    /// The user accepted the ringing inbound call
    pub fn accept(&mut self) -> Result<()> {
        self.phase = self.phase.on(PhaseInput::Accept)?;

        let base = self.event_base("session.connected");
        let attempt = self.require_attempt()?;
        attempt.mark_connected();
        let event = SessionEvent::Connected(CallConnected {
            base,
            session_id: attempt.session_id().clone(),
            role: attempt.role(),
        });
        self.record_event(event);

        Ok(())
    }

    /// The user rejected the ringing inbound call
    pub fn reject(&mut self) -> Result<CallAttempt> {
        self.phase = self.phase.on(PhaseInput::Reject)?;
        self.end_attempt(EndReason::Rejected)
    }

    /// Whether a remote-stream event for `call` is attachable right now.
    /// Anything failing this check is stale and must be discarded.
    pub fn can_attach_remote(&self, call: &CallHandle) -> bool {
        let matches = self
            .attempt
            .as_ref()
            .is_some_and(|a| a.is_current_call(call) && a.remote_stream().is_none());
        matches && matches!(self.phase, CallPhase::Dialing | CallPhase::Connected)
    }

    /// Attach the remote stream delivered for `call`.
    ///
    /// From `Dialing` this connects the call and returns `true`; in
    /// `Connected` (callee side, stream arriving after the answer) it
    /// attaches without a phase change and returns `false`.
    pub fn remote_stream_attached(
        &mut self,
        call: &CallHandle,
        stream: StreamHandle,
    ) -> Result<bool> {
        if !self.can_attach_remote(call) {
            return Err(DomainError::StaleEvent(format!(
                "stream event for {} does not match the current session",
                call
            )));
        }

        let phase_changed = match self.phase {
            CallPhase::Dialing => {
                self.phase = self.phase.on(PhaseInput::RemoteStreamAttached)?;
                true
            }
            _ => false,
        };

        let base = self.event_base("session.stream_attached");
        let attempt = self.require_attempt()?;
        attempt.attach_remote_stream(stream);
        let event = SessionEvent::StreamAttached(StreamAttached {
            base,
            session_id: attempt.session_id().clone(),
        });
        self.record_event(event);

        Ok(phase_changed)
    }

    /// Begin tearing down the current attempt. Returns the attempt with
    /// its stream handles already released so the orchestrator can close
    /// the underlying connection and call.
    pub fn hang_up(&mut self, reason: EndReason) -> Result<CallAttempt> {
        self.phase = self.phase.on(PhaseInput::HangUp)?;
        self.end_attempt(reason)
    }

    /// Teardown finished; back to idle, ready for reuse
    pub fn closed(&mut self) -> Result<()> {
        self.phase = self.phase.on(PhaseInput::Closed)?;
        Ok(())
    }

    /// A signaling error struck; any current attempt is dropped
    pub fn fail(&mut self, message: &str) -> Result<()> {
        self.phase = self.phase.on(PhaseInput::SignalingError)?;

        if self.attempt.is_some() {
            // Recorded as an ended attempt so listeners see the teardown
            let _ = self.end_attempt(EndReason::Error(message.to_string()));
        }
        self.record_event(SessionEvent::Faulted(Faulted {
            base: self.event_base("session.faulted"),
            message: message.to_string(),
        }));

        Ok(())
    }

    /// Manual recovery from the failed phase
    pub fn reset(&mut self) -> Result<()> {
        self.phase = self.phase.on(PhaseInput::Reset)?;
        Ok(())
    }

    /// Hold a data connection that arrived outside an attempt, or attach
    /// it to the current attempt when the peer matches
    pub fn adopt_connection(&mut self, connection: ConnectionHandle) {
        match self.attempt.as_mut() {
            Some(attempt) if attempt.remote() == connection.peer() => {
                attempt.set_data_channel(connection);
            }
            _ => self.pending_connection = Some(connection),
        }
    }

    /// Endpoint teardown: drop the local capture handle. Only legal when
    /// no call attempt is alive.
    pub fn release_local_media(&mut self) -> Result<()> {
        if self.phase.is_in_call() || self.phase == CallPhase::Closing {
            return Err(DomainError::InvalidTransition(format!(
                "cannot release local media in phase {:?}",
                self.phase
            )));
        }
        self.local_stream = None;
        if self.phase == CallPhase::Idle {
            self.phase = CallPhase::AwaitingLocalMedia;
        }
        Ok(())
    }

    fn end_attempt(&mut self, reason: EndReason) -> Result<CallAttempt> {
        let mut attempt = self.attempt.take().ok_or_else(|| {
            DomainError::InvalidTransition("no call attempt to end".to_string())
        })?;

        let duration_seconds = attempt.duration().map(|d| d.num_seconds());
        attempt.release_streams();

        self.record_event(SessionEvent::Ended(CallEnded {
            base: self.event_base("session.ended"),
            session_id: attempt.session_id().clone(),
            reason,
            duration_seconds,
        }));

        Ok(attempt)
    }

    fn require_local_stream(&self) -> Result<StreamHandle> {
        self.local_stream.ok_or_else(|| {
            DomainError::InvalidTransition("local media is not ready".to_string())
        })
    }

    fn require_attempt(&mut self) -> Result<&mut CallAttempt> {
        self.attempt.as_mut().ok_or_else(|| {
            DomainError::InvalidTransition("no current call attempt".to_string())
        })
    }

    fn event_base(&self, event_type: &str) -> SessionEventBase {
        SessionEventBase::new(event_type, self.identity.clone())
    }

    fn record_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // Getters
    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn local_stream(&self) -> Option<StreamHandle> {
        self.local_stream
    }

    pub fn attempt(&self) -> Option<&CallAttempt> {
        self.attempt.as_ref()
    }
}
