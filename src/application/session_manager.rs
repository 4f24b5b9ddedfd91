//! Session manager - call lifecycle orchestration

use crate::domain::session::aggregate::PeerSession;
use crate::domain::session::media::MediaPort;
use crate::domain::session::signaling::{SignalingEvent, SignalingPort};
use crate::domain::session::value_object::{CallPhase, EndReason, PhaseInput};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{PeerIdentity, SessionCode};
use crate::interface::events::{NoticeBroadcaster, NoticeErrorKind, SessionNotice};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Orchestrates the call lifecycle for one endpoint.
///
/// UI intents and signaling events both funnel through the single
/// session mutex, so transitions never interleave: one intent or event
/// is processed to completion before the next is admitted. Side effects
/// are confined to the signaling and media ports; state changes are
/// published as notices the UI layer subscribes to.
pub struct SessionManager {
    identity: PeerIdentity,
    session: Mutex<PeerSession>,
    signaling: Arc<dyn SignalingPort>,
    media: Arc<dyn MediaPort>,
    notices: NoticeBroadcaster,
    /// Whether the identity is registered with the signaling network.
    /// Only read and written under the session mutex.
    registered: AtomicBool,
}

impl SessionManager {
    pub fn new(
        identity: PeerIdentity,
        signaling: Arc<dyn SignalingPort>,
        media: Arc<dyn MediaPort>,
    ) -> Self {
        let session = PeerSession::new(identity.clone());
        Self {
            identity,
            session: Mutex::new(session),
            signaling,
            media,
            notices: NoticeBroadcaster::default(),
            registered: AtomicBool::new(false),
        }
    }

    /// The local endpoint's sharing code, displayable by the UI
    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    /// Subscribe to UI notices
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Current call phase
    pub async fn phase(&self) -> CallPhase {
        self.session.lock().await.phase()
    }

    /// Whether a call attempt is currently alive
    pub async fn has_active_attempt(&self) -> bool {
        self.session.lock().await.attempt().is_some()
    }

    /// Register the identity with the signaling network and acquire
    /// local media. Until this succeeds, calls cannot be placed or
    /// received.
    ///
    /// Retryable: a failed media acquisition leaves the registration in
    /// place, so a later call picks up at the acquisition step.
    pub async fn startup(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        if !self.registered.load(Ordering::Relaxed) {
            if let Err(err) = self.signaling.open(&self.identity).await {
                warn!(identity = %self.identity, error = %err, "identity registration failed");
                self.fail_session(&mut session, &err.to_string());
                return Err(err);
            }
            self.registered.store(true, Ordering::Relaxed);
        }

        match self.media.acquire_local_stream().await {
            Ok(stream) => {
                let from = session.phase();
                session.local_media_ready(stream).map_err(|err| {
                    self.reject_command(&session, err)
                })?;
                info!(identity = %self.identity, "local media ready");
                self.publish_phase(from, session.phase());
                self.drain_events(&mut session);
                Ok(())
            }
            Err(err) => {
                warn!(identity = %self.identity, error = %err, "local media acquisition failed");
                self.notices.publish(SessionNotice::error(
                    NoticeErrorKind::MediaAcquisitionFailed,
                    &err.to_string(),
                ));
                Err(err)
            }
        }
    }

    /// Place an outbound call to the peer named by `code`
    pub async fn place_call(&self, code: &str) -> Result<()> {
        let code = SessionCode::parse(code)?;
        let mut session = self.session.lock().await;

        // Reject illegal intents before touching the adapter
        session
            .phase()
            .on(PhaseInput::PlaceCall)
            .map_err(|err| self.reject_command(&session, err))?;
        let local_stream = session.local_stream().ok_or_else(|| {
            self.reject_command(
                &session,
                DomainError::InvalidTransition("local media is not ready".to_string()),
            )
        })?;

        let connection = match self.signaling.connect(&code).await {
            Ok(conn) => conn,
            Err(err) => {
                self.fail_session(&mut session, &err.to_string());
                return Err(err);
            }
        };
        let call = match self.signaling.call(&code, &local_stream).await {
            Ok(call) => call,
            Err(err) => {
                self.fail_session(&mut session, &err.to_string());
                return Err(err);
            }
        };

        let from = session.phase();
        session.place_call(code.as_identity(), call, connection)?;
        info!(identity = %self.identity, target = %code, "call placed");
        self.publish_phase(from, session.phase());
        self.drain_events(&mut session);

        Ok(())
    }

    /// Answer the ringing inbound call with the local stream
    pub async fn accept_incoming(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        session
            .phase()
            .on(PhaseInput::Accept)
            .map_err(|err| self.reject_command(&session, err))?;

        let call = session
            .attempt()
            .and_then(|a| a.call())
            .cloned()
            .ok_or_else(|| {
                DomainError::InvalidTransition("no inbound call to accept".to_string())
            })?;
        let local_stream = session.local_stream().ok_or_else(|| {
            DomainError::InvalidTransition("local media is not ready".to_string())
        })?;

        if let Err(err) = self.signaling.answer(&call, &local_stream).await {
            self.fail_session(&mut session, &err.to_string());
            return Err(err);
        }

        let from = session.phase();
        session.accept()?;
        info!(identity = %self.identity, remote = %call.peer(), "call accepted");
        self.publish_phase(from, session.phase());
        self.drain_events(&mut session);

        Ok(())
    }

    /// Decline the ringing inbound call and tear down the nascent
    /// connection
    pub async fn reject_incoming(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        session
            .phase()
            .on(PhaseInput::Reject)
            .map_err(|err| self.reject_command(&session, err))?;

        let from = session.phase();
        let attempt = session.reject()?;
        info!(identity = %self.identity, remote = %attempt.remote(), "call rejected");

        if let Some(call) = attempt.call() {
            if let Err(err) = self.signaling.close_call(call).await {
                warn!(error = %err, "closing rejected call failed");
            }
        }
        if let Some(conn) = attempt.data_channel() {
            if let Err(err) = self.signaling.close_connection(conn).await {
                warn!(error = %err, "closing rejected connection failed");
            }
        }

        self.publish_phase(from, session.phase());
        self.drain_events(&mut session);

        Ok(())
    }

    /// Hang up the current call
    pub async fn hang_up(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session
            .phase()
            .on(PhaseInput::HangUp)
            .map_err(|err| self.reject_command(&session, err))?;
        self.hang_up_locked(&mut session, EndReason::LocalHangUp, true)
            .await
    }

    /// Manual recovery from the failed phase
    pub async fn reset(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        let from = session.phase();
        session
            .reset()
            .map_err(|err| self.reject_command(&session, err))?;
        info!(identity = %self.identity, "session reset");
        self.publish_phase(from, session.phase());

        Ok(())
    }

    /// Tear the endpoint down: hang up any live call and release the
    /// local capture stream
    pub async fn shutdown(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        if session.phase().is_in_call() {
            self.hang_up_locked(&mut session, EndReason::LocalHangUp, true)
                .await?;
        }

        if session.local_stream().is_some() {
            session.release_local_media()?;
            self.media.release_local().await;
        }
        info!(identity = %self.identity, "session shut down");

        Ok(())
    }

    /// Feed one signaling event into the serialized processing path.
    ///
    /// Stale events are discarded here with a debug log and never
    /// surface as failures.
    pub async fn ingest(&self, event: SignalingEvent) -> Result<()> {
        let mut session = self.session.lock().await;

        match event {
            SignalingEvent::Opened(identity) => {
                info!(identity = %identity, "identity registered");
                self.notices
                    .publish(SessionNotice::identity_ready(identity.as_str()));
            }
            SignalingEvent::IncomingConnection(connection) => {
                debug!(peer = %connection.peer(), "incoming data connection");
                session.adopt_connection(connection);
            }
            SignalingEvent::IncomingCall(call) => {
                if session.phase() == CallPhase::Idle {
                    let from = session.phase();
                    let remote = call.peer().clone();
                    session.inbound_call(call)?;
                    info!(identity = %self.identity, remote = %remote, "inbound call ringing");
                    self.publish_phase(from, session.phase());
                    self.notices
                        .publish(SessionNotice::incoming_call(remote.as_str()));
                    self.drain_events(&mut session);
                } else {
                    // Busy policy: decline without touching the current session
                    info!(
                        identity = %self.identity,
                        remote = %call.peer(),
                        phase = %session.phase(),
                        "busy, auto-rejecting inbound call"
                    );
                    if let Err(err) = self.signaling.close_call(&call).await {
                        warn!(error = %err, "declining inbound call failed");
                    }
                }
            }
            SignalingEvent::RemoteStream { call, stream } => {
                if !session.can_attach_remote(&call) {
                    debug!(call = %call, "discarding stale remote stream event");
                    return Ok(());
                }

                if let Err(err) = self.media.attach_remote(&stream).await {
                    warn!(error = %err, "attaching remote stream failed");
                    self.notices.publish(SessionNotice::error(
                        NoticeErrorKind::MediaAcquisitionFailed,
                        &err.to_string(),
                    ));
                    return Err(err);
                }

                let from = session.phase();
                match session.remote_stream_attached(&call, stream) {
                    Ok(true) => {
                        info!(identity = %self.identity, remote = %call.peer(), "call connected");
                        self.publish_phase(from, session.phase());
                    }
                    Ok(false) => {
                        debug!(identity = %self.identity, "remote stream attached");
                    }
                    Err(DomainError::StaleEvent(msg)) => {
                        debug!(reason = %msg, "discarding stale remote stream event");
                    }
                    Err(err) => return Err(err),
                }
                self.drain_events(&mut session);
            }
            SignalingEvent::RemoteClosed(session_id) => {
                let matches = session
                    .attempt()
                    .is_some_and(|a| a.session_id() == &session_id);
                if matches && session.phase().is_in_call() {
                    info!(identity = %self.identity, session = %session_id, "remote hung up");
                    // The remote side already closed; no adapter teardown here
                    self.hang_up_locked(&mut session, EndReason::RemoteHangUp, false)
                        .await?;
                } else {
                    debug!(session = %session_id, "discarding stale close event");
                }
            }
            SignalingEvent::Error(message) => {
                if session.phase() == CallPhase::Failed {
                    warn!(error = %message, "signaling error while already failed");
                } else {
                    self.fail_session(&mut session, &message);
                    return Err(DomainError::SignalingFailure(message));
                }
            }
        }

        Ok(())
    }

    /// Pump signaling events from the adapter into `ingest` until the
    /// channel closes
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<SignalingEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.ingest(event).await {
                debug!(identity = %self.identity, error = %err, "event handling failed");
            }
        }
        debug!(identity = %self.identity, "signaling event channel closed");
    }

    /// Drive hang-up through Closing to Idle, closing adapter handles
    /// when this endpoint initiated the teardown
    async fn hang_up_locked(
        &self,
        session: &mut MutexGuard<'_, PeerSession>,
        reason: EndReason,
        close_handles: bool,
    ) -> Result<()> {
        let from = session.phase();
        let attempt = session.hang_up(reason)?;
        self.publish_phase(from, session.phase());

        if close_handles {
            if let Some(call) = attempt.call() {
                if let Err(err) = self.signaling.close_call(call).await {
                    warn!(error = %err, "closing call failed");
                }
            }
            if let Some(conn) = attempt.data_channel() {
                if let Err(err) = self.signaling.close_connection(conn).await {
                    warn!(error = %err, "closing connection failed");
                }
            }
        }

        let closing = session.phase();
        session.closed()?;
        info!(identity = %self.identity, remote = %attempt.remote(), "call ended");
        self.publish_phase(closing, session.phase());
        self.drain_events(session);

        Ok(())
    }

    /// Drive the machine into Failed and surface the error notice
    fn fail_session(&self, session: &mut MutexGuard<'_, PeerSession>, message: &str) {
        let from = session.phase();
        match session.fail(message) {
            Ok(()) => self.publish_phase(from, session.phase()),
            Err(err) => debug!(error = %err, "already failed"),
        }
        self.notices.publish(SessionNotice::error(
            NoticeErrorKind::SignalingFailure,
            message,
        ));
        self.drain_events(session);
    }

    /// An illegal command was rejected: state is unchanged, re-publish
    /// the current phase so the UI can resynchronize
    fn reject_command(&self, session: &MutexGuard<'_, PeerSession>, err: DomainError) -> DomainError {
        debug!(identity = %self.identity, phase = %session.phase(), error = %err, "command rejected");
        self.notices
            .publish(SessionNotice::state_changed(session.phase(), session.phase()));
        err
    }

    fn publish_phase(&self, from: CallPhase, to: CallPhase) {
        if from != to {
            self.notices.publish(SessionNotice::state_changed(from, to));
        }
    }

    fn drain_events(&self, session: &mut MutexGuard<'_, PeerSession>) {
        for event in session.take_events() {
            debug!(peer = %event.peer(), event = event.event_type(), "session event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::media::MockMediaPort;
    use crate::domain::session::signaling::MockSignalingPort;
    use crate::domain::shared::value_objects::{CallHandle, ConnectionHandle, StreamHandle};
    use uuid::Uuid;

    fn manager_with(
        signaling: MockSignalingPort,
        media: MockMediaPort,
    ) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            PeerIdentity::new("03ab"),
            Arc::new(signaling),
            Arc::new(media),
        ))
    }

    fn working_media() -> MockMediaPort {
        let mut media = MockMediaPort::new();
        media
            .expect_acquire_local_stream()
            .returning(|| Ok(StreamHandle::new()));
        media.expect_attach_remote().returning(|_| Ok(()));
        media.expect_release_local().returning(|| ());
        media
    }

    #[tokio::test]
    async fn test_startup_media_failure_leaves_awaiting_media() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));

        let mut media = MockMediaPort::new();
        media.expect_acquire_local_stream().returning(|| {
            Err(DomainError::MediaAcquisitionFailed(
                "permission denied".to_string(),
            ))
        });

        let manager = manager_with(signaling, media);
        let mut notices = manager.subscribe();

        let result = manager.startup().await;
        assert!(matches!(
            result,
            Err(DomainError::MediaAcquisitionFailed(_))
        ));
        assert_eq!(manager.phase().await, CallPhase::AwaitingLocalMedia);

        match notices.recv().await.unwrap() {
            SessionNotice::Error { kind, .. } => {
                assert_eq!(kind, NoticeErrorKind::MediaAcquisitionFailed)
            }
            other => panic!("unexpected notice: {:?}", other),
        }

        // Calls cannot proceed without media
        let result = manager.place_call("7f2k").await;
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_startup_retry_after_media_failure_skips_reregistration() {
        let mut signaling = MockSignalingPort::new();
        // The identity must be registered exactly once across both attempts
        signaling.expect_open().times(1).returning(|_| Ok(()));

        let mut media = MockMediaPort::new();
        let mut granted = false;
        media
            .expect_acquire_local_stream()
            .times(2)
            .returning(move || {
                if granted {
                    Ok(StreamHandle::new())
                } else {
                    granted = true;
                    Err(DomainError::MediaAcquisitionFailed(
                        "permission denied".to_string(),
                    ))
                }
            });

        let manager = manager_with(signaling, media);

        let result = manager.startup().await;
        assert!(matches!(
            result,
            Err(DomainError::MediaAcquisitionFailed(_))
        ));
        assert_eq!(manager.phase().await, CallPhase::AwaitingLocalMedia);

        // The user grants the permission and retries
        manager.startup().await.unwrap();
        assert_eq!(manager.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn test_startup_open_failure_drives_failed() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| {
            Err(DomainError::SignalingFailure("server unreachable".to_string()))
        });

        let manager = manager_with(signaling, MockMediaPort::new());

        assert!(manager.startup().await.is_err());
        assert_eq!(manager.phase().await, CallPhase::Failed);

        manager.reset().await.unwrap();
        assert_eq!(manager.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn test_place_call_reaches_dialing() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));
        signaling.expect_connect().returning(|code| {
            Ok(ConnectionHandle::new(Uuid::new_v4(), code.as_identity()))
        });
        signaling.expect_call().times(1).returning(|code, _| {
            Ok(CallHandle::new(Uuid::new_v4(), code.as_identity()))
        });

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();

        manager.place_call(" 7f2k ").await.unwrap();
        assert_eq!(manager.phase().await, CallPhase::Dialing);
        assert!(manager.has_active_attempt().await);

        // A second call while dialing is rejected without adapter calls
        let result = manager.place_call("zz99").await;
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
        assert_eq!(manager.phase().await, CallPhase::Dialing);
    }

    #[tokio::test]
    async fn test_place_call_rejects_malformed_code() {
        let signaling = MockSignalingPort::new();
        let manager = manager_with(signaling, MockMediaPort::new());

        assert!(matches!(
            manager.place_call("").await,
            Err(DomainError::ValidationError(_))
        ));
        assert!(matches!(
            manager.place_call("bad code!").await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_drives_failed() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));
        signaling.expect_connect().returning(|_| {
            Err(DomainError::SignalingFailure("peer unavailable".to_string()))
        });

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();

        assert!(manager.place_call("7f2k").await.is_err());
        assert_eq!(manager.phase().await, CallPhase::Failed);
    }

    #[tokio::test]
    async fn test_answer_failure_drives_failed() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));
        signaling.expect_answer().returning(|_, _| {
            Err(DomainError::SignalingFailure("negotiation failed".to_string()))
        });

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();

        let call = CallHandle::new(Uuid::new_v4(), PeerIdentity::new("7f2k"));
        manager
            .ingest(SignalingEvent::IncomingCall(call))
            .await
            .unwrap();
        assert_eq!(manager.phase().await, CallPhase::Ringing);

        assert!(manager.accept_incoming().await.is_err());
        assert_eq!(manager.phase().await, CallPhase::Failed);
    }

    #[tokio::test]
    async fn test_busy_inbound_call_is_declined() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));
        signaling.expect_connect().returning(|code| {
            Ok(ConnectionHandle::new(Uuid::new_v4(), code.as_identity()))
        });
        signaling.expect_call().returning(|code, _| {
            Ok(CallHandle::new(Uuid::new_v4(), code.as_identity()))
        });
        // The busy decline must close exactly the offered call
        signaling.expect_close_call().times(1).returning(|_| Ok(()));

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();
        manager.place_call("7f2k").await.unwrap();

        let late = CallHandle::new(Uuid::new_v4(), PeerIdentity::new("zz99"));
        manager
            .ingest(SignalingEvent::IncomingCall(late))
            .await
            .unwrap();

        // Still dialing the original peer
        assert_eq!(manager.phase().await, CallPhase::Dialing);
    }

    #[tokio::test]
    async fn test_stale_stream_event_is_discarded() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));

        // attach_remote must never run for a stale event
        let mut media = MockMediaPort::new();
        media
            .expect_acquire_local_stream()
            .returning(|| Ok(StreamHandle::new()));
        media.expect_attach_remote().times(0);

        let manager = manager_with(signaling, media);
        manager.startup().await.unwrap();

        let ghost = CallHandle::new(Uuid::new_v4(), PeerIdentity::new("7f2k"));
        manager
            .ingest(SignalingEvent::RemoteStream {
                call: ghost,
                stream: StreamHandle::new(),
            })
            .await
            .unwrap();

        assert_eq!(manager.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn test_accept_in_idle_is_invalid_and_republishes_state() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();
        let mut notices = manager.subscribe();

        let result = manager.accept_incoming().await;
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
        assert_eq!(manager.phase().await, CallPhase::Idle);

        match notices.recv().await.unwrap() {
            SessionNotice::StateChanged { from, to, .. } => {
                assert_eq!(from, CallPhase::Idle);
                assert_eq!(to, CallPhase::Idle);
            }
            other => panic!("unexpected notice: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signaling_error_event_drives_failed() {
        let mut signaling = MockSignalingPort::new();
        signaling.expect_open().returning(|_| Ok(()));

        let manager = manager_with(signaling, working_media());
        manager.startup().await.unwrap();

        let result = manager
            .ingest(SignalingEvent::Error("connection lost".to_string()))
            .await;
        assert!(matches!(result, Err(DomainError::SignalingFailure(_))));
        assert_eq!(manager.phase().await, CallPhase::Failed);
    }
}
