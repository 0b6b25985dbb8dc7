// ABOUTME: One worker process: accept loop on a port-shared listener, one task per connection
// ABOUTME: Handles drain (bounded grace period) and forced shutdown, answers coordinator control lines

use crate::backend::{Backend, BackendFactory};
use crate::config::GatewayConfig;
use crate::control::{ControlMessage, WorkerStatus};
use crate::error::{GatewayError, GatewayResult};
use crate::handler::{CloseReason, ConnectionHandler};
use crate::session::SessionId;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

const LISTEN_BACKLOG: u32 = 1024;

/// Consecutive non-transient accept failures before the worker gives up
const MAX_ACCEPT_FAILURES: u32 = 16;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind a listener that other processes may bind to the same address.
///
/// Every worker calls this on the same `addr`; with `SO_REUSEPORT` the kernel
/// spreads incoming connections across them.
pub fn bind_shared(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    #[cfg(unix)]
    socket.set_reuseport(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

/// Lifecycle controls of a running [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    drain: CancellationToken,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl WorkerHandle {
    /// Stop accepting; sessions get `drain_grace_period` to finish
    pub fn drain(&self) {
        self.drain.cancel();
    }

    /// Stop accepting and close every session now
    pub fn shutdown(&self) {
        self.drain.cancel();
        self.shutdown.cancel();
    }

    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// What a worker did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub sessions_served: u64,
    /// Sessions that were still open when shutdown was forced
    pub closed_on_shutdown: usize,
}

pub struct Worker {
    index: usize,
    config: Arc<GatewayConfig>,
    backend: Arc<dyn Backend>,
    listener: TcpListener,
    sessions: TaskTracker,
    drain: CancellationToken,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
    forced: Arc<AtomicUsize>,
}

impl Worker {
    /// Bind the shared listener. Must be called inside a tokio runtime.
    pub fn bind(
        index: usize,
        config: Arc<GatewayConfig>,
        backend: Arc<dyn Backend>,
    ) -> GatewayResult<Self> {
        let addr = config.listen_address;
        let listener =
            bind_shared(addr).map_err(|source| GatewayError::Bind { addr, source })?;

        Ok(Self {
            index,
            config,
            backend,
            listener,
            sessions: TaskTracker::new(),
            drain: CancellationToken::new(),
            shutdown: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
            forced: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            drain: self.drain.clone(),
            shutdown: self.shutdown.clone(),
            active: Arc::clone(&self.active),
        }
    }

    /// Accept connections until drained, then wind the sessions down.
    pub async fn run(self) -> GatewayResult<WorkerReport> {
        let Worker {
            index,
            config,
            backend,
            listener,
            sessions,
            drain,
            shutdown,
            active,
            forced,
        } = self;

        tracing::info!(
            worker = index,
            addr = ?listener.local_addr().ok(),
            "accepting connections"
        );

        let mut next_id: u64 = 0;
        let mut failures: u32 = 0;
        let mut fatal = None;

        loop {
            let accepted = tokio::select! {
                biased;
                _ = drain.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(connection) => {
                    failures = 0;
                    connection
                }
                Err(err) if is_transient(&err) => {
                    tracing::debug!(worker = index, error = %err, "transient accept error");
                    continue;
                }
                Err(err) => {
                    failures += 1;
                    tracing::error!(worker = index, error = %err, failures, "accept failed");
                    if failures >= MAX_ACCEPT_FAILURES {
                        fatal = Some(err);
                        break;
                    }
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            next_id += 1;
            let id = SessionId(next_id);
            let handler = ConnectionHandler::new(
                id,
                socket,
                Arc::clone(&config),
                Arc::clone(&backend),
                shutdown.child_token(),
            );
            let span = tracing::info_span!("session", worker = index, id = next_id, %peer);
            let active = Arc::clone(&active);
            let forced = Arc::clone(&forced);

            active.fetch_add(1, Ordering::Relaxed);
            sessions.spawn(
                async move {
                    tracing::info!("connection accepted");
                    let reason = handler.run().await;
                    if reason == CloseReason::Shutdown {
                        forced.fetch_add(1, Ordering::Relaxed);
                    }
                    active.fetch_sub(1, Ordering::Relaxed);
                }
                .instrument(span),
            );
        }

        drop(listener);
        sessions.close();

        if fatal.is_none() && !shutdown.is_cancelled() {
            tracing::info!(
                worker = index,
                active = active.load(Ordering::Relaxed),
                grace = ?config.drain_grace_period,
                "draining"
            );
            if tokio::time::timeout(config.drain_grace_period, sessions.wait())
                .await
                .is_err()
            {
                tracing::warn!(
                    worker = index,
                    remaining = active.load(Ordering::Relaxed),
                    "grace period over, closing remaining sessions"
                );
            }
        }

        shutdown.cancel();
        sessions.wait().await;

        if let Some(err) = fatal {
            return Err(GatewayError::Accept(err));
        }

        let report = WorkerReport {
            sessions_served: next_id,
            closed_on_shutdown: forced.load(Ordering::Relaxed),
        };
        tracing::info!(worker = index, ?report, "worker stopped");
        Ok(report)
    }
}

async fn send_status<W>(out: &mut W, status: WorkerStatus) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("{status}\n").as_bytes()).await?;
    out.flush().await
}

/// Resolves on SIGINT or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

/// Entry point of a worker process spawned by the coordinator.
///
/// Reads [`ControlMessage`] lines from stdin and writes [`WorkerStatus`]
/// lines to stdout. Losing stdin counts as a drain request.
pub async fn run_worker_process(
    index: usize,
    config: GatewayConfig,
    factory: BackendFactory,
) -> GatewayResult<()> {
    let backend = factory()?;
    let worker = Worker::bind(index, Arc::new(config), backend)?;
    let handle = worker.handle();
    let addr = worker.local_addr()?;

    let mut stdout = tokio::io::stdout();
    send_status(
        &mut stdout,
        WorkerStatus::Ready {
            pid: std::process::id(),
            addr,
        },
    )
    .await?;

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut control_open = true;

    let signal = shutdown_signal();
    tokio::pin!(signal);
    let mut signalled = false;

    let run = worker.run();
    tokio::pin!(run);

    let report = loop {
        tokio::select! {
            result = &mut run => break result?,
            _ = &mut signal, if !signalled => {
                signalled = true;
                handle.drain();
            }
            line = commands.next_line(), if control_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        tracing::warn!(worker = index, "control channel closed, draining");
                        control_open = false;
                        handle.drain();
                        continue;
                    }
                };

                match line.trim().parse::<ControlMessage>() {
                    Ok(ControlMessage::Drain) => {
                        tracing::info!(worker = index, "drain requested");
                        handle.drain();
                    }
                    Ok(ControlMessage::Shutdown) => {
                        tracing::info!(worker = index, "shutdown requested");
                        handle.shutdown();
                    }
                    Ok(ControlMessage::Ping(nonce)) => {
                        let pong = WorkerStatus::Pong {
                            nonce,
                            active_sessions: handle.active_sessions(),
                        };
                        if let Err(err) = send_status(&mut stdout, pong).await {
                            tracing::debug!(worker = index, error = %err, "pong not delivered");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(worker = index, error = %err, line = %line, "bad control line");
                    }
                }
            }
        }
    };

    let ack = WorkerStatus::ShutdownAck {
        closed_sessions: report.closed_on_shutdown,
    };
    if let Err(err) = send_status(&mut stdout, ack).await {
        tracing::debug!(worker = index, error = %err, "shutdown-ack not delivered");
    }
    Ok(())
}
