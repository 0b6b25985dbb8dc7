// ABOUTME: Immutable gateway configuration passed explicitly into every component
// ABOUTME: Defaults mirror a stock SMPP deployment; validate() guards against unusable values

use crate::codec::{PduHeader, MAX_PDU_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Gateway-wide settings.
///
/// Built once (from CLI flags or in tests with the `with_*` setters), wrapped
/// in an `Arc` and handed to each worker, handler and session.
///
/// # Example
///
/// ```rust
/// use smpp_gateway::GatewayConfig;
/// use std::time::Duration;
///
/// let config = GatewayConfig::default()
///     .with_workers(4)
///     .with_backend_call_timeout(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address every worker binds (port shared between workers)
    pub listen_address: SocketAddr,

    /// Number of worker processes the coordinator runs
    pub worker_count: usize,

    /// system_id the gateway reports in bind responses
    pub system_id: String,

    /// A session idle for longer than this is closed
    pub session_timeout: Duration,

    /// Idle time after which the gateway probes a bound client with enquire_link
    pub enquire_link_interval: Duration,

    /// Upper bound for one authenticate or submit call
    pub backend_call_timeout: Duration,

    /// Largest accepted command_length
    pub max_pdu_size: u32,

    /// Consecutive failed binds before the session is closed
    pub max_bind_attempts: u32,

    /// Backend submit calls a session may have running before further
    /// submits are answered with ESME_RTHROTTLED
    pub max_pending_submits: usize,

    /// How long a draining worker waits for sessions to finish on their own
    pub drain_grace_period: Duration,

    /// Interval between coordinator health pings
    pub health_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 2775)),
            worker_count: 2,
            system_id: "smpp-gateway".to_string(),
            session_timeout: Duration::from_secs(300),
            enquire_link_interval: Duration::from_secs(30),
            backend_call_timeout: Duration::from_secs(5),
            max_pdu_size: MAX_PDU_SIZE,
            max_bind_attempts: 3,
            max_pending_submits: 64,
            drain_grace_period: Duration::from_secs(10),
            health_interval: Duration::from_secs(5),
        }
    }
}

impl GatewayConfig {
    pub fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }

    pub fn with_backend_call_timeout(mut self, timeout: Duration) -> Self {
        self.backend_call_timeout = timeout;
        self
    }

    pub fn with_max_pdu_size(mut self, max_pdu_size: u32) -> Self {
        self.max_pdu_size = max_pdu_size;
        self
    }

    pub fn with_max_bind_attempts(mut self, attempts: u32) -> Self {
        self.max_bind_attempts = attempts;
        self
    }

    pub fn with_max_pending_submits(mut self, limit: usize) -> Self {
        self.max_pending_submits = limit;
        self
    }

    pub fn with_drain_grace_period(mut self, grace: Duration) -> Self {
        self.drain_grace_period = grace;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Reject settings the gateway cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_pdu_size < PduHeader::SIZE as u32 {
            return Err(ConfigError::MaxPduSizeTooSmall(self.max_pdu_size));
        }
        if self.system_id.len() >= crate::datatypes::MAX_SYSTEM_ID_LENGTH {
            return Err(ConfigError::SystemIdTooLong(self.system_id.clone()));
        }
        if self.max_bind_attempts == 0 {
            return Err(ConfigError::ZeroValue("max_bind_attempts"));
        }
        if self.max_pending_submits == 0 {
            return Err(ConfigError::ZeroValue("max_pending_submits"));
        }

        for (name, value) in [
            ("session_timeout", self.session_timeout),
            ("enquire_link_interval", self.enquire_link_interval),
            ("backend_call_timeout", self.backend_call_timeout),
            ("health_interval", self.health_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroValue(name));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("worker_count must be at least 1")]
    NoWorkers,

    #[error("max_pdu_size {0} is smaller than the 16 byte PDU header")]
    MaxPduSizeTooSmall(u32),

    #[error("system_id '{0}' does not fit the 15 character limit")]
    SystemIdTooLong(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_address.port(), 2775);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.max_pdu_size, 65536);
        assert_eq!(config.backend_call_timeout, Duration::from_secs(5));
        assert_eq!(config.max_pending_submits, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_values() {
        assert_eq!(
            GatewayConfig::default().with_workers(0).validate(),
            Err(ConfigError::NoWorkers)
        );
        assert_eq!(
            GatewayConfig::default().with_max_pdu_size(8).validate(),
            Err(ConfigError::MaxPduSizeTooSmall(8))
        );
        assert_eq!(
            GatewayConfig::default()
                .with_backend_call_timeout(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroValue("backend_call_timeout"))
        );
        assert_eq!(
            GatewayConfig::default().with_max_pending_submits(0).validate(),
            Err(ConfigError::ZeroValue("max_pending_submits"))
        );
        assert!(matches!(
            GatewayConfig::default()
                .with_system_id("a-very-long-system-id")
                .validate(),
            Err(ConfigError::SystemIdTooLong(_))
        ));
    }
}
