// ABOUTME: Bridges one session to the worker's backend without blocking other sessions
// ABOUTME: Authentication is awaited inline with a timeout; submissions complete through a channel

use crate::backend::{AuthError, Backend, MessageId, SubmitError, SubmitRequest};
use crate::datatypes::Bind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of a submit call, delivered back to the session that issued it.
#[derive(Debug)]
pub struct Completion {
    pub sequence_number: u32,
    pub result: Result<MessageId, SubmitError>,
}

/// Counts a backend task from dispatch until it finishes, timed out or not
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Per-session handle on the backend.
///
/// Submissions run as detached tasks so the session can keep serving
/// enquire_link and further submits while they are in flight. Their results
/// arrive on the receiver returned by [`BackendBridge::new`]; once the session
/// is gone the receiver is dropped and late results are discarded.
pub struct BackendBridge {
    backend: Arc<dyn Backend>,
    call_timeout: Duration,
    completions: mpsc::UnboundedSender<Completion>,
    in_flight: Arc<AtomicUsize>,
}

impl BackendBridge {
    pub fn new(
        backend: Arc<dyn Backend>,
        call_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completions, receiver) = mpsc::unbounded_channel();
        let bridge = Self {
            backend,
            call_timeout,
            completions,
            in_flight: Arc::new(AtomicUsize::new(0)),
        };
        (bridge, receiver)
    }

    /// Submit tasks still running, including ones the session already
    /// answered with a timeout
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Authenticate a bind request. The session is suspended until the backend
    /// answers or `call_timeout` elapses.
    pub async fn authenticate(&self, bind: &Bind) -> Result<(), AuthError> {
        let call = self.backend.authenticate(
            &bind.system_id,
            &bind.password,
            &bind.system_type,
            bind.interface_version,
        );

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::TimedOut(self.call_timeout)),
        }
    }

    /// Start a submission in the background.
    ///
    /// The caller is responsible for tracking the deadline; the task itself
    /// is allowed to run to completion.
    pub fn dispatch_submit(&self, sequence_number: u32, request: SubmitRequest) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        let in_flight = InFlight::enter(&self.in_flight);

        tokio::spawn(async move {
            let _in_flight = in_flight;
            let result = backend
                .submit(
                    &request.source,
                    &request.destination,
                    &request.short_message,
                    &request.options,
                )
                .await;

            let completion = Completion {
                sequence_number,
                result,
            };
            if completions.send(completion).is_err() {
                tracing::debug!(sequence_number, "session closed, discarding submit result");
            }
        });
    }
}
