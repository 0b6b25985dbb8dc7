// ABOUTME: Gateway executable: runs the coordinator, or a single worker when --worker-index is given
// ABOUTME: Maps CLI flags onto GatewayConfig and wires in the in-memory reference backend

use argh::FromArgs;
use smpp_gateway::backend::BackendFactory;
use smpp_gateway::{
    Backend, Coordinator, GatewayConfig, GatewayError, InMemoryBackend, WorkerCommand,
    run_worker_process,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Multi-process SMPP v3.4 gateway
#[derive(FromArgs)]
struct CliArgs {
    /// address to listen on (default: 0.0.0.0:2775)
    #[argh(option, short = 'l')]
    listen: Option<SocketAddr>,

    /// number of worker processes (default: 2)
    #[argh(option, short = 'w')]
    workers: Option<usize>,

    /// system_id reported in bind responses (default: smpp-gateway)
    #[argh(option)]
    system_id: Option<String>,

    /// idle seconds before a session is closed (default: 300)
    #[argh(option)]
    session_timeout: Option<u64>,

    /// idle seconds before a bound client is probed with enquire_link (default: 30)
    #[argh(option)]
    enquire_link_interval: Option<u64>,

    /// seconds a backend call may take (default: 5)
    #[argh(option)]
    backend_timeout: Option<u64>,

    /// largest accepted PDU in bytes (default: 65536)
    #[argh(option)]
    max_pdu_size: Option<u32>,

    /// failed binds before a session is closed (default: 3)
    #[argh(option)]
    max_bind_attempts: Option<u32>,

    /// backend submit calls a session may have running (default: 64)
    #[argh(option)]
    max_pending_submits: Option<usize>,

    /// seconds draining workers wait for sessions to finish (default: 10)
    #[argh(option)]
    drain_grace: Option<u64>,

    /// accepted credential as system_id:password, repeatable (default: accept all)
    #[argh(option, short = 'c')]
    credential: Vec<String>,

    /// run as worker process <index> (set by the coordinator)
    #[argh(option, hidden_help)]
    worker_index: Option<usize>,
}

impl CliArgs {
    fn config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        if let Some(listen) = self.listen {
            config = config.with_listen_address(listen);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(system_id) = &self.system_id {
            config = config.with_system_id(system_id.as_str());
        }
        if let Some(secs) = self.session_timeout {
            config = config.with_session_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.enquire_link_interval {
            config = config.with_enquire_link_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.backend_timeout {
            config = config.with_backend_call_timeout(Duration::from_secs(secs));
        }
        if let Some(size) = self.max_pdu_size {
            config = config.with_max_pdu_size(size);
        }
        if let Some(attempts) = self.max_bind_attempts {
            config = config.with_max_bind_attempts(attempts);
        }
        if let Some(limit) = self.max_pending_submits {
            config = config.with_max_pending_submits(limit);
        }
        if let Some(secs) = self.drain_grace {
            config = config.with_drain_grace_period(Duration::from_secs(secs));
        }
        config
    }

    fn backend_factory(&self) -> Result<BackendFactory, String> {
        let credentials = self
            .credential
            .iter()
            .map(|entry| {
                entry
                    .split_once(':')
                    .map(|(system_id, password)| (system_id.to_string(), password.to_string()))
                    .ok_or_else(|| format!("credential '{entry}' is not system_id:password"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new(move || {
            let backend: Arc<dyn Backend> = if credentials.is_empty() {
                Arc::new(InMemoryBackend::new())
            } else {
                Arc::new(InMemoryBackend::with_credentials(credentials.clone()))
            };
            Ok(backend)
        }))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: CliArgs) -> Result<(), GatewayError> {
    let config = args.config();
    config.validate()?;

    match args.worker_index {
        Some(index) => {
            let factory = args
                .backend_factory()
                .map_err(|reason| GatewayError::WorkerStartup { index, reason })?;
            run_worker_process(index, config, factory).await
        }
        None => {
            // Validate credentials up front so a typo fails here and not in every worker
            if let Err(reason) = args.backend_factory() {
                return Err(GatewayError::WorkerStartup { index: 0, reason });
            }
            let command = WorkerCommand::current_exe(std::env::args_os().skip(1))?;
            Coordinator::new(config, command)?.run().await
        }
    }
}

fn main() -> ExitCode {
    let args: CliArgs = argh::from_env();
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("smpp-gateway: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args));
    // stdin is read on a blocking thread that never returns on its own
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("smpp-gateway: {err}");
            ExitCode::FAILURE
        }
    }
}
