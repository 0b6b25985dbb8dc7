//! A multi-process SMPP v3.4 gateway.
//!
//! Clients (ESMEs) connect over TCP, bind, submit short messages and keep the
//! link alive with enquire_link. Everything that decides whether a client may
//! bind and what happens to a submitted message is delegated to an injected
//! [`Backend`]; the gateway itself only speaks the protocol.
//!
//! The moving parts, bottom up:
//!
//! * [`codec`] and [`datatypes`]: PDU encoding and decoding
//! * [`connection`]: framed reads and writes on a TCP stream
//! * [`session`] and [`tracker`]: the per-connection state machine and its
//!   outstanding backend calls
//! * [`bridge`]: non-blocking access to the backend from a session
//! * [`handler`]: one task per connection tying the above together
//! * [`worker`] and [`coordinator`]: the process model
//!
//! # Running a worker in-process
//!
//! ```rust,no_run
//! use smpp_gateway::{GatewayConfig, InMemoryBackend, Worker};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), smpp_gateway::GatewayError> {
//!     let config = Arc::new(GatewayConfig::default());
//!     let backend = Arc::new(InMemoryBackend::with_credentials([("user1", "secret")]));
//!
//!     let worker = Worker::bind(0, config, backend)?;
//!     let handle = worker.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.drain();
//!     });
//!
//!     let report = worker.run().await?;
//!     println!("served {} sessions", report.sessions_served);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod connection;
pub mod control;
pub mod coordinator;
pub mod datatypes;
pub mod error;
pub mod handler;
mod macros;
pub mod session;
pub mod tracker;
pub mod worker;


pub use backend::{
    Address, AuthError, Backend, BackendError, BackendFactory, InMemoryBackend, MessageId,
    SubmitError, SubmitOptions,
};
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};
pub use config::{ConfigError, GatewayConfig};
pub use coordinator::{Coordinator, HealthSnapshot, WorkerCommand};
pub use error::{GatewayError, GatewayResult};
pub use handler::{CloseReason, ConnectionHandler};
pub use session::{Session, SessionId, SessionState};
pub use worker::{Worker, WorkerHandle, WorkerReport, run_worker_process};
