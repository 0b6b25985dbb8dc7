use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::control::ControlError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Fatal errors of the gateway process. Protocol errors inside a session
/// never surface here; they are answered on the wire.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("accept loop failed: {0}")]
    Accept(#[source] io::Error),

    #[error("worker {index} failed to start: {reason}")]
    WorkerStartup { index: usize, reason: String },

    #[error("control channel: {0}")]
    Control(#[from] ControlError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
