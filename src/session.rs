// ABOUTME: Per-connection SMPP session state machine (OPEN -> BOUND_* -> CLOSED)
// ABOUTME: Turns each inbound frame into a reply, a pending backend call, or nothing

use crate::backend::SubmitRequest;
use crate::bridge::{BackendBridge, Completion};
use crate::codec::Frame;
use crate::config::GatewayConfig;
use crate::datatypes::{
    Bind, BindResponse, BindType, CommandId, CommandStatus, EnquireLink, EnquireLinkResponse,
    GenericNack, SubmitSm, SubmitSmResponse, Unbind, UnbindResponse,
};
use crate::tracker::CorrelationTracker;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Outbound sequence numbers stay below the response bit
const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    BoundTx,
    BoundRx,
    BoundTrx,
    Closed,
}

impl SessionState {
    fn bound_as(bind_type: BindType) -> Self {
        match bind_type {
            BindType::Transmitter => SessionState::BoundTx,
            BindType::Receiver => SessionState::BoundRx,
            BindType::Transceiver => SessionState::BoundTrx,
        }
    }

    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::BoundTx | SessionState::BoundRx | SessionState::BoundTrx
        )
    }

    pub fn can_transmit(self) -> bool {
        matches!(self, SessionState::BoundTx | SessionState::BoundTrx)
    }
}

/// Worker-unique session identifier, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the connection handler should do after a frame was dispatched.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Write this frame and keep going
    Reply(Frame),
    /// Write this frame, then close the connection
    ReplyAndClose(Frame),
    /// A backend call is in flight; its response comes later
    Pending,
    /// Nothing to send
    Ignore,
}

/// Protocol state of one connection.
///
/// Owned by a single connection handler and never shared, so no locking is
/// involved. Time is passed in or read from tokio's clock so paused-time tests
/// drive timeouts deterministically.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: Arc<GatewayConfig>,
    state: SessionState,
    system_id: Option<String>,
    next_sequence: u32,
    last_activity: Instant,
    last_probe: Option<Instant>,
    failed_binds: u32,
    tracker: CorrelationTracker,
}

impl Session {
    pub fn new(id: SessionId, config: Arc<GatewayConfig>) -> Self {
        let tracker = CorrelationTracker::new(config.backend_call_timeout);
        Self {
            id,
            config,
            state: SessionState::Open,
            system_id: None,
            next_sequence: 1,
            last_activity: Instant::now(),
            last_probe: None,
            failed_binds: 0,
            tracker,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn pending_requests(&self) -> usize {
        self.tracker.len()
    }

    /// Handle one inbound frame to completion.
    ///
    /// Only a bind suspends here (authentication); submissions are handed to
    /// the bridge and tracked, so the next frame can be read right away.
    pub async fn dispatch(&mut self, frame: Frame, bridge: &BackendBridge) -> Outcome {
        if self.state == SessionState::Closed {
            return Outcome::Ignore;
        }
        self.last_activity = Instant::now();

        match frame {
            Frame::Bind(bind) => self.on_bind(bind, bridge).await,
            Frame::Unbind(unbind) => self.on_unbind(unbind),
            Frame::SubmitSm(submit) => self.on_submit(*submit, bridge),
            Frame::EnquireLink(enquire) => Outcome::Reply(Frame::EnquireLinkResp(
                EnquireLinkResponse::new(enquire.sequence_number),
            )),
            Frame::EnquireLinkResp(_) => {
                tracing::trace!(session = %self.id, "keepalive answered");
                Outcome::Ignore
            }
            Frame::GenericNack(nack) => {
                tracing::warn!(
                    session = %self.id,
                    sequence_number = nack.sequence_number,
                    status = ?nack.command_status,
                    "client rejected a PDU"
                );
                Outcome::Ignore
            }
            Frame::Unknown {
                command_id,
                sequence_number,
                ..
            } => {
                tracing::warn!(
                    session = %self.id,
                    command_id = %format!("{command_id:#010x}"),
                    sequence_number,
                    "unsupported command"
                );
                Outcome::Reply(Frame::GenericNack(GenericNack::invalid_command_id(
                    sequence_number,
                )))
            }
            other => {
                tracing::debug!(
                    session = %self.id,
                    command = other.name(),
                    sequence_number = other.sequence_number(),
                    "ignoring unsolicited response"
                );
                Outcome::Ignore
            }
        }
    }

    async fn on_bind(&mut self, bind: Bind, bridge: &BackendBridge) -> Outcome {
        let bind_type = bind.bind_type;
        let sequence_number = bind.sequence_number;

        if self.state.is_bound() {
            tracing::warn!(
                session = %self.id,
                system_id = %bind.system_id,
                "bind on an already bound session"
            );
            return Outcome::Reply(Frame::BindResp(BindResponse::error(
                bind_type,
                sequence_number,
                CommandStatus::AlreadyBound,
            )));
        }

        let result = bridge.authenticate(&bind).await;
        self.last_activity = Instant::now();

        match result {
            Ok(()) => {
                self.state = SessionState::bound_as(bind_type);
                self.failed_binds = 0;
                tracing::info!(
                    session = %self.id,
                    system_id = %bind.system_id,
                    state = ?self.state,
                    "bound"
                );
                self.system_id = Some(bind.system_id);

                Outcome::Reply(Frame::BindResp(BindResponse::new(
                    bind_type,
                    sequence_number,
                    self.config.system_id.as_str(),
                )))
            }
            Err(err) => {
                self.failed_binds += 1;
                tracing::warn!(
                    session = %self.id,
                    system_id = %bind.system_id,
                    attempt = self.failed_binds,
                    error = %err,
                    "bind rejected"
                );

                let response = Frame::BindResp(BindResponse::error(
                    bind_type,
                    sequence_number,
                    err.to_command_status(),
                ));
                if self.failed_binds >= self.config.max_bind_attempts {
                    self.close();
                    Outcome::ReplyAndClose(response)
                } else {
                    Outcome::Reply(response)
                }
            }
        }
    }

    fn on_unbind(&mut self, unbind: Unbind) -> Outcome {
        if !self.state.is_bound() {
            return Outcome::Reply(Frame::UnbindResp(UnbindResponse::error(
                unbind.sequence_number,
                CommandStatus::InvalidBindStatus,
            )));
        }

        tracing::info!(
            session = %self.id,
            system_id = self.system_id.as_deref().unwrap_or_default(),
            discarded = self.tracker.len(),
            "unbind"
        );
        self.close();
        Outcome::ReplyAndClose(Frame::UnbindResp(UnbindResponse::new(
            unbind.sequence_number,
        )))
    }

    fn on_submit(&mut self, submit: SubmitSm, bridge: &BackendBridge) -> Outcome {
        let sequence_number = submit.sequence_number;

        if !self.state.can_transmit() {
            tracing::debug!(
                session = %self.id,
                sequence_number,
                state = ?self.state,
                "submit_sm outside a transmitting bind"
            );
            return Outcome::Reply(Frame::SubmitSmResp(SubmitSmResponse::error(
                sequence_number,
                CommandStatus::InvalidBindStatus,
            )));
        }

        // Duplicates fall through so they are still nacked at the limit
        let in_flight = bridge.in_flight();
        if in_flight >= self.config.max_pending_submits && !self.tracker.is_pending(sequence_number)
        {
            tracing::warn!(
                session = %self.id,
                sequence_number,
                in_flight,
                "too many backend calls outstanding, throttling"
            );
            return Outcome::Reply(Frame::SubmitSmResp(SubmitSmResponse::error(
                sequence_number,
                CommandStatus::Throttled,
            )));
        }

        if let Err(err) = self
            .tracker
            .track(sequence_number, CommandId::SubmitSm, Instant::now())
        {
            tracing::warn!(session = %self.id, error = %err, "duplicate sequence_number");
            return Outcome::Reply(Frame::GenericNack(GenericNack::duplicate_sequence(
                sequence_number,
            )));
        }

        let system_id = self.system_id.as_deref().unwrap_or_default();
        bridge.dispatch_submit(sequence_number, SubmitRequest::from_pdu(&submit, system_id));
        Outcome::Pending
    }

    /// Turn a backend completion into its submit_sm_resp. Results for requests
    /// that already expired, or for a closed session, are dropped.
    pub fn complete(&mut self, completion: Completion) -> Option<Frame> {
        if self.state == SessionState::Closed {
            return None;
        }

        let Some(pending) = self.tracker.complete(completion.sequence_number) else {
            tracing::debug!(
                session = %self.id,
                sequence_number = completion.sequence_number,
                "late backend result discarded"
            );
            return None;
        };

        let response = match completion.result {
            Ok(message_id) => {
                tracing::debug!(
                    session = %self.id,
                    sequence_number = pending.sequence_number,
                    message_id = %message_id,
                    elapsed = ?pending.issued_at.elapsed(),
                    "submit accepted"
                );
                SubmitSmResponse::new(pending.sequence_number, message_id)
            }
            Err(err) => {
                tracing::info!(
                    session = %self.id,
                    sequence_number = pending.sequence_number,
                    error = %err,
                    "submit rejected by backend"
                );
                SubmitSmResponse::error(pending.sequence_number, err.to_command_status())
            }
        };
        Some(Frame::SubmitSmResp(response))
    }

    /// Synthesize SYSTEM_ERROR responses for every backend call past its deadline.
    pub fn expire(&mut self, now: Instant) -> Vec<Frame> {
        self.tracker
            .expire(now)
            .into_iter()
            .map(|pending| {
                tracing::warn!(
                    session = %self.id,
                    sequence_number = pending.sequence_number,
                    timeout = ?self.config.backend_call_timeout,
                    "backend call timed out"
                );
                Frame::SubmitSmResp(SubmitSmResponse::error(
                    pending.sequence_number,
                    CommandStatus::SystemError,
                ))
            })
            .collect()
    }

    /// Whether the client has been silent for longer than `session_timeout`
    pub fn is_idle(&self, now: Instant) -> bool {
        now >= self.last_activity + self.config.session_timeout
    }

    fn keepalive_due(&self) -> Option<Instant> {
        if !self.state.is_bound() {
            return None;
        }
        let base = self
            .last_probe
            .map_or(self.last_activity, |probe| probe.max(self.last_activity));
        Some(base + self.config.enquire_link_interval)
    }

    /// An enquire_link to send if a bound session has been quiet for
    /// `enquire_link_interval`.
    pub fn poll_keepalive(&mut self, now: Instant) -> Option<Frame> {
        let due = self.keepalive_due()?;
        if now < due {
            return None;
        }
        self.last_probe = Some(now);
        Some(Frame::EnquireLink(EnquireLink::new(self.next_sequence_number())))
    }

    /// When the handler next needs to wake up without any I/O
    pub fn next_wakeup(&self) -> Instant {
        let idle = self.last_activity + self.config.session_timeout;
        [self.keepalive_due(), self.tracker.next_deadline()]
            .into_iter()
            .flatten()
            .fold(idle, Instant::min)
    }

    /// Unbind to send before a forced close, if the client is bound
    pub fn shutdown_frame(&mut self) -> Option<Frame> {
        if !self.state.is_bound() {
            return None;
        }
        Some(Frame::Unbind(Unbind::new(self.next_sequence_number())))
    }

    /// Enter CLOSED. Results of in-flight backend calls will be discarded.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.tracker.clear();
    }

    fn next_sequence_number(&mut self) -> u32 {
        let sequence_number = self.next_sequence;
        self.next_sequence = if sequence_number >= MAX_SEQUENCE_NUMBER {
            1
        } else {
            sequence_number + 1
        };
        sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        Address, AuthError, Backend, InMemoryBackend, MessageId, SubmitError, SubmitOptions,
    };
    use crate::datatypes::InterfaceVersion;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Counts submit calls and never answers them
    #[derive(Default)]
    struct CountingBackend {
        submits: AtomicUsize,
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn authenticate(
            &self,
            _system_id: &str,
            password: &str,
            _system_type: &str,
            _interface_version: InterfaceVersion,
        ) -> Result<(), AuthError> {
            if password == "pass" {
                Ok(())
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }

        async fn submit(
            &self,
            _source: &Address,
            _destination: &Address,
            _short_message: &Bytes,
            _options: &SubmitOptions,
        ) -> Result<MessageId, SubmitError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn setup() -> (
        Session,
        BackendBridge,
        mpsc::UnboundedReceiver<Completion>,
        Arc<CountingBackend>,
    ) {
        let config = Arc::new(GatewayConfig::default());
        let backend = Arc::new(CountingBackend::default());
        let (bridge, rx) = BackendBridge::new(backend.clone(), config.backend_call_timeout);
        (Session::new(SessionId(1), config), bridge, rx, backend)
    }

    fn bind(bind_type: BindType, sequence_number: u32, password: &str) -> Frame {
        Frame::Bind(Bind::new(bind_type, sequence_number, "user1", password).with_system_type("SMPP"))
    }

    fn submit(sequence_number: u32) -> Frame {
        Frame::SubmitSm(Box::new(SubmitSm::new(sequence_number, "1000", "2000", "hi")))
    }

    fn status_of(outcome: &Outcome) -> u32 {
        match outcome {
            Outcome::Reply(frame) | Outcome::ReplyAndClose(frame) => frame.command_status(),
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bind_transmitter_enters_bound_tx() {
        let (mut session, bridge, _rx, _) = setup();

        let outcome = session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;

        match outcome {
            Outcome::Reply(Frame::BindResp(resp)) => {
                assert_eq!(resp.command_status, CommandStatus::Ok);
                assert_eq!(resp.system_id, "smpp-gateway");
                assert_eq!(resp.sequence_number, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.state(), SessionState::BoundTx);
        assert_eq!(session.system_id(), Some("user1"));
    }

    #[tokio::test]
    async fn failed_bind_stays_open_until_attempts_run_out() {
        let (mut session, bridge, _rx, _) = setup();

        for attempt in 1..=3 {
            let outcome = session
                .dispatch(bind(BindType::Transmitter, attempt, "wrong"), &bridge)
                .await;
            assert_eq!(status_of(&outcome), CommandStatus::BindFailed as u32);

            if attempt < 3 {
                assert!(matches!(outcome, Outcome::Reply(_)));
                assert_eq!(session.state(), SessionState::Open);
            } else {
                assert!(matches!(outcome, Outcome::ReplyAndClose(_)));
                assert_eq!(session.state(), SessionState::Closed);
            }
        }
    }

    #[tokio::test]
    async fn second_bind_is_already_bound() {
        let (mut session, bridge, _rx, _) = setup();
        session
            .dispatch(bind(BindType::Transceiver, 1, "pass"), &bridge)
            .await;

        let outcome = session
            .dispatch(bind(BindType::Receiver, 2, "pass"), &bridge)
            .await;
        assert_eq!(status_of(&outcome), CommandStatus::AlreadyBound as u32);
        assert_eq!(session.state(), SessionState::BoundTrx);
    }

    #[tokio::test]
    async fn submit_while_open_never_reaches_backend() {
        let (mut session, bridge, _rx, backend) = setup();

        let outcome = session.dispatch(submit(5), &bridge).await;
        assert_eq!(status_of(&outcome), CommandStatus::InvalidBindStatus as u32);
        tokio::task::yield_now().await;
        assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn receiver_cannot_submit() {
        let (mut session, bridge, _rx, backend) = setup();
        session
            .dispatch(bind(BindType::Receiver, 1, "pass"), &bridge)
            .await;

        let outcome = session.dispatch(submit(2), &bridge).await;
        assert_eq!(status_of(&outcome), CommandStatus::InvalidBindStatus as u32);
        tokio::task::yield_now().await;
        assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_pending_sequence_is_nacked_once() {
        let (mut session, bridge, _rx, backend) = setup();
        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;

        assert_eq!(session.dispatch(submit(9), &bridge).await, Outcome::Pending);
        let outcome = session.dispatch(submit(9), &bridge).await;
        match outcome {
            Outcome::Reply(Frame::GenericNack(nack)) => {
                assert_eq!(nack.sequence_number, 9);
                assert_eq!(nack.command_status, CommandStatus::UnknownError);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        // Let the one dispatched submit reach the backend
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(session.pending_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submits_beyond_the_backend_window_are_throttled() {
        let config = Arc::new(GatewayConfig::default().with_max_pending_submits(2));
        let backend = Arc::new(CountingBackend::default());
        let (bridge, _rx) = BackendBridge::new(backend.clone(), config.backend_call_timeout);
        let mut session = Session::new(SessionId(4), Arc::clone(&config));
        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;

        assert_eq!(session.dispatch(submit(2), &bridge).await, Outcome::Pending);
        assert_eq!(session.dispatch(submit(3), &bridge).await, Outcome::Pending);

        let outcome = session.dispatch(submit(4), &bridge).await;
        assert_eq!(status_of(&outcome), CommandStatus::Throttled as u32);
        assert!(matches!(outcome, Outcome::Reply(Frame::SubmitSmResp(_))));

        // A duplicate is still a duplicate at the limit
        let outcome = session.dispatch(submit(2), &bridge).await;
        assert!(matches!(outcome, Outcome::Reply(Frame::GenericNack(_))));

        // Timed-out calls keep their backend task, so the window stays full
        tokio::time::advance(config.backend_call_timeout * 2).await;
        assert_eq!(session.expire(Instant::now()).len(), 2);
        assert_eq!(session.pending_requests(), 0);

        let outcome = session.dispatch(submit(5), &bridge).await;
        assert_eq!(status_of(&outcome), CommandStatus::Throttled as u32);
        assert_eq!(backend.submits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enquire_link_is_answered_in_any_open_state() {
        let (mut session, bridge, _rx, _) = setup();

        let outcome = session
            .dispatch(Frame::EnquireLink(EnquireLink::new(77)), &bridge)
            .await;
        assert_eq!(
            outcome,
            Outcome::Reply(Frame::EnquireLinkResp(EnquireLinkResponse::new(77)))
        );
    }

    #[tokio::test]
    async fn unknown_command_gets_generic_nack() {
        let (mut session, bridge, _rx, _) = setup();
        let frame = Frame::Unknown {
            command_id: 0x0000_0103,
            command_status: 0,
            sequence_number: 12,
            body: Bytes::new(),
        };

        let outcome = session.dispatch(frame, &bridge).await;
        assert_eq!(
            outcome,
            Outcome::Reply(Frame::GenericNack(GenericNack::invalid_command_id(12)))
        );
    }

    #[tokio::test]
    async fn unbind_requires_a_bind() {
        let (mut session, bridge, _rx, _) = setup();

        let outcome = session
            .dispatch(Frame::Unbind(Unbind::new(3)), &bridge)
            .await;
        assert_eq!(status_of(&outcome), CommandStatus::InvalidBindStatus as u32);
        assert_eq!(session.state(), SessionState::Open);

        session
            .dispatch(bind(BindType::Transmitter, 4, "pass"), &bridge)
            .await;
        let outcome = session
            .dispatch(Frame::Unbind(Unbind::new(5)), &bridge)
            .await;
        assert!(matches!(
            outcome,
            Outcome::ReplyAndClose(Frame::UnbindResp(_))
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn overdue_submit_becomes_system_error() {
        let (mut session, bridge, _rx, _) = setup();
        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;
        session.dispatch(submit(2), &bridge).await;

        let deadline = session.next_wakeup();
        tokio::time::sleep_until(deadline).await;

        let responses = session.expire(Instant::now());
        assert_eq!(
            responses,
            vec![Frame::SubmitSmResp(SubmitSmResponse::error(
                2,
                CommandStatus::SystemError
            ))]
        );

        // A result arriving afterwards is dropped
        let late = Completion {
            sequence_number: 2,
            result: Ok("abc123".to_string()),
        };
        assert!(session.complete(late).is_none());
        assert_eq!(session.state(), SessionState::BoundTx);
    }

    #[tokio::test]
    async fn completion_becomes_submit_resp() {
        let config = Arc::new(GatewayConfig::default());
        let (bridge, mut rx) =
            BackendBridge::new(Arc::new(InMemoryBackend::new()), config.backend_call_timeout);
        let mut session = Session::new(SessionId(2), config);

        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;
        session.dispatch(submit(2), &bridge).await;

        let completion = rx.recv().await.unwrap();
        assert_eq!(
            session.complete(completion),
            Some(Frame::SubmitSmResp(SubmitSmResponse::new(2, "00000001")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_only_probes_bound_idle_sessions() {
        let (mut session, bridge, _rx, _) = setup();
        let interval = GatewayConfig::default().enquire_link_interval;

        tokio::time::advance(interval).await;
        assert!(session.poll_keepalive(Instant::now()).is_none());

        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;
        assert!(session.poll_keepalive(Instant::now()).is_none());

        tokio::time::advance(interval).await;
        let probe = session.poll_keepalive(Instant::now()).unwrap();
        assert!(matches!(probe, Frame::EnquireLink(_)));
        assert_eq!(probe.sequence_number(), 1);

        // Not again until another interval passes
        assert!(session.poll_keepalive(Instant::now()).is_none());
        tokio::time::advance(interval).await;
        assert_eq!(
            session.poll_keepalive(Instant::now()).unwrap().sequence_number(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_is_detected() {
        let (session, _bridge, _rx, _) = setup();
        assert!(!session.is_idle(Instant::now()));

        tokio::time::advance(GatewayConfig::default().session_timeout).await;
        assert!(session.is_idle(Instant::now()));
    }

    #[test]
    fn outbound_sequence_wraps_below_response_bit() {
        let mut session = Session {
            next_sequence: MAX_SEQUENCE_NUMBER,
            ..setup_sync()
        };
        assert_eq!(session.next_sequence_number(), MAX_SEQUENCE_NUMBER);
        assert_eq!(session.next_sequence_number(), 1);
    }

    fn setup_sync() -> Session {
        Session::new(SessionId(3), Arc::new(GatewayConfig::default()))
    }

    #[tokio::test]
    async fn shutdown_frame_only_for_bound_sessions() {
        let (mut session, bridge, _rx, _) = setup();
        assert!(session.shutdown_frame().is_none());

        session
            .dispatch(bind(BindType::Transmitter, 1, "pass"), &bridge)
            .await;
        assert!(matches!(session.shutdown_frame(), Some(Frame::Unbind(_))));
    }
}
