// ABOUTME: Drives one TCP connection: reads frames, runs them through the session, writes replies
// ABOUTME: Multiplexes socket reads, backend completions, timers and worker cancellation

use crate::backend::Backend;
use crate::bridge::{BackendBridge, Completion};
use crate::codec::Frame;
use crate::config::GatewayConfig;
use crate::connection::{Connection, ConnectionError};
use crate::datatypes::{CommandStatus, GenericNack};
use crate::session::{Outcome, Session, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;

/// How long a best-effort unbind may take during a forced close
const UNBIND_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client unbound cleanly
    Unbound,
    /// Client closed the socket between frames
    PeerClosed,
    /// Too many failed bind attempts
    BindAttemptsExceeded,
    /// No traffic for `session_timeout`
    IdleTimeout,
    /// Unrecoverable framing error
    ProtocolError,
    /// Reset, EOF mid-frame or I/O failure
    TransportError,
    /// Worker shutdown or drain deadline
    Shutdown,
}

enum Event {
    Cancelled,
    Read(Result<Option<Frame>, ConnectionError>),
    Completed(Completion),
    Timer,
}

/// Owns one socket and its session until the session is CLOSED.
pub struct ConnectionHandler {
    connection: Connection,
    session: Session,
    bridge: BackendBridge,
    completions: mpsc::UnboundedReceiver<Completion>,
    cancel: CancellationToken,
}

impl ConnectionHandler {
    pub fn new(
        id: SessionId,
        socket: TcpStream,
        config: Arc<GatewayConfig>,
        backend: Arc<dyn Backend>,
        cancel: CancellationToken,
    ) -> Self {
        let (bridge, completions) = BackendBridge::new(backend, config.backend_call_timeout);
        Self {
            connection: Connection::new(socket, config.max_pdu_size),
            session: Session::new(id, config),
            bridge,
            completions,
            cancel,
        }
    }

    /// Serve the connection to the end. Resources are released on return.
    pub async fn run(mut self) -> CloseReason {
        let reason = self.serve().await;

        self.session.close();
        if let Err(err) = self.connection.shutdown().await {
            tracing::trace!(error = %err, "socket shutdown failed");
        }

        tracing::info!(session = %self.session.id(), reason = ?reason, "session closed");
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        loop {
            let wakeup = self.session.next_wakeup();

            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Event::Cancelled,
                Some(completion) = self.completions.recv() => Event::Completed(completion),
                result = self.connection.read_frame() => Event::Read(result),
                _ = sleep_until(wakeup) => Event::Timer,
            };

            let step = match event {
                Event::Cancelled => {
                    self.unbind_before_close().await;
                    return CloseReason::Shutdown;
                }
                Event::Read(result) => self.on_read(result).await,
                Event::Completed(completion) => match self.session.complete(completion) {
                    Some(response) => self.send(response).await.map(|_| None),
                    None => Ok(None),
                },
                Event::Timer => self.on_timer().await,
            };

            match step {
                Ok(None) => continue,
                Ok(Some(reason)) => return reason,
                Err(err) => {
                    tracing::debug!(session = %self.session.id(), error = %err, "write failed");
                    return CloseReason::TransportError;
                }
            }
        }
    }

    async fn on_read(
        &mut self,
        result: Result<Option<Frame>, ConnectionError>,
    ) -> Result<Option<CloseReason>, ConnectionError> {
        match result {
            Ok(Some(frame)) => {
                tracing::debug!(
                    session = %self.session.id(),
                    command = frame.name(),
                    sequence_number = frame.sequence_number(),
                    "received"
                );

                match self.session.dispatch(frame, &self.bridge).await {
                    Outcome::Reply(response) => self.send(response).await.map(|_| None),
                    Outcome::ReplyAndClose(response) => {
                        self.send(response).await?;
                        Ok(Some(match self.session.system_id() {
                            Some(_) => CloseReason::Unbound,
                            None => CloseReason::BindAttemptsExceeded,
                        }))
                    }
                    Outcome::Pending | Outcome::Ignore => Ok(None),
                }
            }
            Ok(None) => Ok(Some(CloseReason::PeerClosed)),
            Err(ConnectionError::Malformed {
                command_id,
                sequence_number,
                source,
            }) => {
                tracing::warn!(
                    session = %self.session.id(),
                    command_id = %format!("{command_id:#010x}"),
                    sequence_number,
                    error = %source,
                    "malformed PDU"
                );
                let nack = GenericNack::new(source.to_command_status(), sequence_number);
                self.send(Frame::GenericNack(nack)).await.map(|_| None)
            }
            Err(ConnectionError::Framing {
                sequence_number,
                source,
            }) => {
                tracing::warn!(
                    session = %self.session.id(),
                    sequence_number,
                    error = %source,
                    "framing error, closing"
                );
                if let Some(sequence_number) = sequence_number {
                    let nack = GenericNack::new(source.to_command_status(), sequence_number);
                    self.send(Frame::GenericNack(nack)).await?;
                }
                Ok(Some(CloseReason::ProtocolError))
            }
            Err(err) => {
                tracing::debug!(session = %self.session.id(), error = %err, "transport error");
                Ok(Some(CloseReason::TransportError))
            }
        }
    }

    async fn on_timer(&mut self) -> Result<Option<CloseReason>, ConnectionError> {
        let now = Instant::now();

        for response in self.session.expire(now) {
            self.send(response).await?;
        }

        if self.session.is_idle(now) {
            tracing::info!(session = %self.session.id(), "idle timeout");
            self.unbind_before_close().await;
            return Ok(Some(CloseReason::IdleTimeout));
        }

        if let Some(probe) = self.session.poll_keepalive(now) {
            tracing::debug!(
                session = %self.session.id(),
                sequence_number = probe.sequence_number(),
                "sending enquire_link"
            );
            self.send(probe).await?;
        }

        Ok(None)
    }

    /// Write a frame. A frame that cannot be encoded is replaced by a
    /// generic_nack so the client still gets an answer for its sequence number.
    async fn send(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        match self.connection.write_frame(&frame).await {
            Err(ConnectionError::Encode(err)) => {
                tracing::error!(
                    session = %self.session.id(),
                    command = frame.name(),
                    error = %err,
                    "failed to encode response"
                );
                let nack = GenericNack::new(CommandStatus::UnknownError, frame.sequence_number());
                self.connection
                    .write_frame(&Frame::GenericNack(nack))
                    .await
            }
            other => other,
        }
    }

    async fn unbind_before_close(&mut self) {
        let Some(unbind) = self.session.shutdown_frame() else {
            return;
        };
        match timeout(UNBIND_WRITE_TIMEOUT, self.connection.write_frame(&unbind)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(session = %self.session.id(), error = %err, "unbind not delivered");
            }
            Err(_) => {
                tracing::debug!(session = %self.session.id(), "unbind write timed out");
            }
        }
    }
}
