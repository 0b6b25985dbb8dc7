// ABOUTME: Parent process: launches worker processes, supervises them over their stdin/stdout
// ABOUTME: Health pings, restart on unexpected exit, drain/shutdown broadcast on SIGINT/SIGTERM

use crate::config::GatewayConfig;
use crate::control::{ControlMessage, WorkerStatus};
use crate::error::{GatewayError, GatewayResult};
use crate::worker::shutdown_signal;
use std::ffi::OsString;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// Extra time on top of the drain grace period before workers are forced
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(2);

/// How a worker process is launched. `--worker-index <i>` is appended.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = OsString>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Re-launch the running executable with the given arguments
    pub fn current_exe(args: impl IntoIterator<Item = OsString>) -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, args))
    }

    fn command(&self, index: usize) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--worker-index")
            .arg(index.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

/// Last known state of one worker
#[derive(Debug, Clone, Default)]
pub struct WorkerHealth {
    pub pid: Option<u32>,
    pub addr: Option<SocketAddr>,
    pub last_pong: Option<Instant>,
    pub active_sessions: usize,
    pub missed_pongs: u32,
    pub restarts: u32,
}

#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub workers: Vec<WorkerHealth>,
}

impl HealthSnapshot {
    pub fn total_sessions(&self) -> usize {
        self.workers.iter().map(|w| w.active_sessions).sum()
    }

    /// Every worker is running and answered its last ping
    pub fn is_healthy(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.pid.is_some() && w.missed_pongs == 0)
    }
}

/// Shared view of worker health, updated by the supervisors.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    workers: Arc<Mutex<Vec<WorkerHealth>>>,
}

impl HealthMonitor {
    fn new(count: usize) -> Self {
        Self {
            workers: Arc::new(Mutex::new(vec![WorkerHealth::default(); count])),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkerHealth>> {
        match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn update(&self, index: usize, f: impl FnOnce(&mut WorkerHealth)) {
        if let Some(health) = self.lock().get_mut(index) {
            f(health);
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            workers: self.lock().clone(),
        }
    }
}

#[derive(Clone)]
struct Lifecycle {
    drain: CancellationToken,
    shutdown: CancellationToken,
    kill: CancellationToken,
}

/// Runs `worker_count` worker processes and owns their lifecycle.
pub struct Coordinator {
    config: Arc<GatewayConfig>,
    command: WorkerCommand,
    health: HealthMonitor,
    lifecycle: Lifecycle,
}

impl Coordinator {
    pub fn new(config: GatewayConfig, command: WorkerCommand) -> GatewayResult<Self> {
        config.validate()?;
        let health = HealthMonitor::new(config.worker_count);
        Ok(Self {
            config: Arc::new(config),
            command,
            health,
            lifecycle: Lifecycle {
                drain: CancellationToken::new(),
                shutdown: CancellationToken::new(),
                kill: CancellationToken::new(),
            },
        })
    }

    pub fn health(&self) -> HealthMonitor {
        self.health.clone()
    }

    /// Start the workers, wait for SIGINT/SIGTERM, then drain them.
    pub async fn run(self) -> GatewayResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Like [`Coordinator::run`] with a caller supplied stop trigger.
    pub async fn run_until<F>(self, stop: F) -> GatewayResult<()>
    where
        F: Future<Output = ()>,
    {
        let supervisors = TaskTracker::new();
        let mut startups = Vec::with_capacity(self.config.worker_count);

        for index in 0..self.config.worker_count {
            let (ready_tx, ready_rx) = oneshot::channel();
            let supervisor = Supervisor {
                index,
                command: self.command.clone(),
                config: Arc::clone(&self.config),
                health: self.health.clone(),
                lifecycle: self.lifecycle.clone(),
            };
            supervisors.spawn(supervisor.run(ready_tx));
            startups.push((index, ready_rx));
        }
        supervisors.close();

        let mut startup_error = None;
        for (index, ready) in startups {
            let result = match ready.await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::WorkerStartup {
                    index,
                    reason: "supervisor exited".to_string(),
                }),
            };
            if let Err(err) = result {
                startup_error.get_or_insert(err);
            }
        }

        if let Some(err) = startup_error {
            tracing::error!(error = %err, "worker startup failed, stopping gateway");
            self.lifecycle.drain.cancel();
            self.lifecycle.shutdown.cancel();
            self.lifecycle.kill.cancel();
            supervisors.wait().await;
            return Err(err);
        }

        tracing::info!(
            workers = self.config.worker_count,
            addr = %self.config.listen_address,
            "gateway ready"
        );

        tokio::pin!(stop);
        let mut report = tokio::time::interval(self.config.health_interval);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = report.tick() => {
                    let snapshot = self.health.snapshot();
                    tracing::debug!(
                        sessions = snapshot.total_sessions(),
                        healthy = snapshot.is_healthy(),
                        "health"
                    );
                }
            }
        }

        tracing::info!(grace = ?self.config.drain_grace_period, "draining workers");
        self.lifecycle.drain.cancel();

        let deadline = self.config.drain_grace_period + SHUTDOWN_MARGIN;
        if tokio::time::timeout(deadline, supervisors.wait()).await.is_err() {
            tracing::warn!("workers still running, forcing shutdown");
            self.lifecycle.shutdown.cancel();
            if tokio::time::timeout(SHUTDOWN_MARGIN, supervisors.wait())
                .await
                .is_err()
            {
                tracing::warn!("killing remaining workers");
                self.lifecycle.kill.cancel();
                supervisors.wait().await;
            }
        }

        tracing::info!("gateway stopped");
        Ok(())
    }
}

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

async fn send(stdin: &mut ChildStdin, message: ControlMessage) -> io::Result<()> {
    stdin.write_all(format!("{message}\n").as_bytes()).await?;
    stdin.flush().await
}

/// Keeps one worker slot filled until the gateway stops.
struct Supervisor {
    index: usize,
    command: WorkerCommand,
    config: Arc<GatewayConfig>,
    health: HealthMonitor,
    lifecycle: Lifecycle,
}

impl Supervisor {
    async fn run(self, ready_tx: oneshot::Sender<GatewayResult<()>>) {
        let mut ready_tx = Some(ready_tx);

        loop {
            let process = match self.start().await {
                Ok(process) => process,
                Err(err) => {
                    if let Some(ready_tx) = ready_tx.take() {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                    tracing::error!(worker = self.index, error = %err, "restart failed");
                    if self.wait_or_drain(RESTART_BACKOFF).await {
                        return;
                    }
                    continue;
                }
            };
            if let Some(ready_tx) = ready_tx.take() {
                let _ = ready_tx.send(Ok(()));
            }

            let exited_early = self.watch(process).await;
            self.health.update(self.index, |h| h.pid = None);

            if !exited_early || self.lifecycle.drain.is_cancelled() {
                return;
            }

            self.health.update(self.index, |h| h.restarts += 1);
            if self.wait_or_drain(RESTART_BACKOFF).await {
                return;
            }
            tracing::info!(worker = self.index, "restarting worker");
        }
    }

    /// Sleep for `delay`; true if the gateway started draining meanwhile
    async fn wait_or_drain(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.lifecycle.drain.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    async fn start(&self) -> GatewayResult<WorkerProcess> {
        let index = self.index;
        let startup_error = |reason: String| GatewayError::WorkerStartup { index, reason };

        let mut child = self
            .command
            .command(index)
            .spawn()
            .map_err(|err| startup_error(err.to_string()))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(startup_error("worker stdio not captured".to_string()));
        };
        let mut stdout = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(STARTUP_TIMEOUT, async {
            loop {
                match stdout.next_line().await {
                    Ok(Some(line)) => match line.parse::<WorkerStatus>() {
                        Ok(WorkerStatus::Ready { pid, addr }) => return Ok((pid, addr)),
                        Ok(other) => {
                            tracing::debug!(worker = index, status = %other, "ignored before ready")
                        }
                        Err(err) => {
                            tracing::warn!(worker = index, error = %err, "bad status line")
                        }
                    },
                    Ok(None) => return Err("exited before becoming ready".to_string()),
                    Err(err) => return Err(err.to_string()),
                }
            }
        })
        .await;

        let (pid, addr) = match ready {
            Ok(Ok(ready)) => ready,
            Ok(Err(reason)) => return Err(startup_error(reason)),
            Err(_) => return Err(startup_error(format!("not ready within {STARTUP_TIMEOUT:?}"))),
        };

        tracing::info!(worker = index, pid, %addr, "worker ready");
        self.health.update(index, |h| {
            h.pid = Some(pid);
            h.addr = Some(addr);
            h.last_pong = Some(Instant::now());
            h.missed_pongs = 0;
        });

        Ok(WorkerProcess {
            child,
            stdin,
            stdout,
        })
    }

    /// Relay lifecycle signals and health pings until the process exits.
    /// Returns true if it exited without being asked to.
    async fn watch(&self, process: WorkerProcess) -> bool {
        let WorkerProcess {
            mut child,
            mut stdin,
            mut stdout,
        } = process;
        let index = self.index;

        let mut ping = tokio::time::interval(self.config.health_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping.tick().await;

        let mut nonce: u64 = 0;
        let mut awaiting: Option<u64> = None;
        let mut drain_sent = false;
        let mut shutdown_sent = false;
        let mut stdout_open = true;

        loop {
            tokio::select! {
                status = child.wait() => {
                    let asked = drain_sent || shutdown_sent;
                    match status {
                        Ok(status) if asked => {
                            tracing::info!(worker = index, %status, "worker exited");
                        }
                        Ok(status) => {
                            tracing::warn!(worker = index, %status, "worker exited unexpectedly");
                        }
                        Err(err) => {
                            tracing::error!(worker = index, error = %err, "failed to wait for worker");
                        }
                    }
                    return !asked;
                }
                _ = self.lifecycle.kill.cancelled() => {
                    if let Err(err) = child.kill().await {
                        tracing::warn!(worker = index, error = %err, "failed to kill worker");
                    }
                    return false;
                }
                _ = self.lifecycle.shutdown.cancelled(), if !shutdown_sent => {
                    shutdown_sent = true;
                    if let Err(err) = send(&mut stdin, ControlMessage::Shutdown).await {
                        tracing::debug!(worker = index, error = %err, "shutdown not delivered");
                    }
                }
                _ = self.lifecycle.drain.cancelled(), if !drain_sent => {
                    drain_sent = true;
                    if let Err(err) = send(&mut stdin, ControlMessage::Drain).await {
                        tracing::debug!(worker = index, error = %err, "drain not delivered");
                    }
                }
                _ = ping.tick(), if !drain_sent => {
                    if let Some(missed) = awaiting {
                        self.health.update(index, |h| h.missed_pongs += 1);
                        tracing::warn!(worker = index, nonce = missed, "worker missed a health ping");
                    }
                    nonce += 1;
                    awaiting = Some(nonce);
                    if let Err(err) = send(&mut stdin, ControlMessage::Ping(nonce)).await {
                        tracing::debug!(worker = index, error = %err, "ping not delivered");
                    }
                }
                line = stdout.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => match line.parse::<WorkerStatus>() {
                        Ok(WorkerStatus::Pong { nonce: answered, active_sessions }) => {
                            if awaiting == Some(answered) {
                                awaiting = None;
                            }
                            self.health.update(index, |h| {
                                h.last_pong = Some(Instant::now());
                                h.active_sessions = active_sessions;
                                h.missed_pongs = 0;
                            });
                        }
                        Ok(WorkerStatus::ShutdownAck { closed_sessions }) => {
                            tracing::info!(worker = index, closed_sessions, "worker acknowledged shutdown");
                        }
                        Ok(WorkerStatus::Ready { .. }) => {}
                        Err(err) => {
                            tracing::warn!(worker = index, error = %err, "bad status line");
                        }
                    },
                    Ok(None) | Err(_) => stdout_open = false,
                },
            }
        }
    }
}
