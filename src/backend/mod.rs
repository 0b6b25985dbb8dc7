// ABOUTME: The backend capability: the only extension point of the gateway
// ABOUTME: Authentication and message submission are delegated to an injected trait object

mod memory;

pub use memory::{InMemoryBackend, StoredMessage};

use crate::datatypes::{
    CommandStatus, InterfaceVersion, NumericPlanIndicator, PriorityFlag, SubmitSm, TlvMap,
    TypeOfNumber,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Identifier the backend assigns to an accepted message
pub type MessageId = String;

/// An SME address as carried in submit_sm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub ton: TypeOfNumber,
    pub npi: NumericPlanIndicator,
    pub value: String,
}

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            ton: TypeOfNumber::Unknown,
            npi: NumericPlanIndicator::Unknown,
            value: value.into(),
        }
    }
}

/// Everything in a submit_sm besides the addresses and the user data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitOptions {
    /// system_id the submitting session is bound as
    pub system_id: String,
    pub service_type: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: PriorityFlag,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub data_coding: u8,
    pub tlvs: TlvMap,
}

/// A submit_sm unpacked into the arguments of [`Backend::submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub source: Address,
    pub destination: Address,
    pub short_message: Bytes,
    pub options: SubmitOptions,
}

impl SubmitRequest {
    pub fn from_pdu(pdu: &SubmitSm, system_id: &str) -> Self {
        Self {
            source: Address {
                ton: pdu.source_addr_ton,
                npi: pdu.source_addr_npi,
                value: pdu.source_addr.clone(),
            },
            destination: Address {
                ton: pdu.dest_addr_ton,
                npi: pdu.dest_addr_npi,
                value: pdu.destination_addr.clone(),
            },
            short_message: pdu.message().clone(),
            options: SubmitOptions {
                system_id: system_id.to_string(),
                service_type: pdu.service_type.clone(),
                esm_class: pdu.esm_class,
                protocol_id: pdu.protocol_id,
                priority_flag: pdu.priority_flag,
                schedule_delivery_time: pdu.schedule_delivery_time.clone(),
                validity_period: pdu.validity_period.clone(),
                registered_delivery: pdu.registered_delivery,
                data_coding: pdu.data_coding,
                tlvs: pdu.tlvs.clone(),
            },
        }
    }
}

/// Externally supplied authentication and submission logic.
///
/// One instance is built per worker process and shared by every session in
/// that worker, so implementations must be `Send + Sync`. Calls may take as
/// long as they like; the gateway bounds them with `backend_call_timeout`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn authenticate(
        &self,
        system_id: &str,
        password: &str,
        system_type: &str,
        interface_version: InterfaceVersion,
    ) -> Result<(), AuthError>;

    async fn submit(
        &self,
        source: &Address,
        destination: &Address,
        short_message: &Bytes,
        options: &SubmitOptions,
    ) -> Result<MessageId, SubmitError>;
}

/// Builds the backend of a worker. Called once per worker at startup.
pub type BackendFactory = Arc<dyn Fn() -> Result<Arc<dyn Backend>, BackendError> + Send + Sync>;

/// The backend could not be constructed.
#[derive(Debug, Error)]
#[error("backend construction failed: {0}")]
pub struct BackendError(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid password")]
    InvalidPassword,

    #[error("unknown system_id")]
    InvalidSystemId,

    #[error("authentication unavailable: {0}")]
    Unavailable(String),

    #[error("authentication timed out after {0:?}")]
    TimedOut(Duration),
}

impl AuthError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            AuthError::InvalidCredentials => CommandStatus::BindFailed,
            AuthError::InvalidPassword => CommandStatus::InvalidPassword,
            AuthError::InvalidSystemId => CommandStatus::InvalidSystemId,
            AuthError::Unavailable(_) | AuthError::TimedOut(_) => CommandStatus::SystemError,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("invalid source address")]
    InvalidSourceAddress,

    #[error("invalid destination address")]
    InvalidDestinationAddress,

    #[error("throttled")]
    Throttled,

    #[error("message queue full")]
    QueueFull,

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("submission unavailable: {0}")]
    Unavailable(String),
}

impl SubmitError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            SubmitError::InvalidSourceAddress => CommandStatus::InvalidSourceAddress,
            SubmitError::InvalidDestinationAddress => CommandStatus::InvalidDestinationAddress,
            SubmitError::Throttled => CommandStatus::Throttled,
            SubmitError::QueueFull => CommandStatus::MessageQueueFull,
            SubmitError::Rejected(_) => CommandStatus::SubmitFailed,
            SubmitError::Unavailable(_) => CommandStatus::SystemError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::tags;

    #[test]
    fn auth_errors_map_to_bind_statuses() {
        assert_eq!(
            AuthError::InvalidCredentials.to_command_status(),
            CommandStatus::BindFailed
        );
        assert_eq!(
            AuthError::InvalidPassword.to_command_status(),
            CommandStatus::InvalidPassword
        );
        assert_eq!(
            AuthError::TimedOut(Duration::from_secs(5)).to_command_status(),
            CommandStatus::SystemError
        );
    }

    #[test]
    fn submit_errors_map_to_submit_statuses() {
        assert_eq!(
            SubmitError::Throttled.to_command_status(),
            CommandStatus::Throttled
        );
        assert_eq!(
            SubmitError::QueueFull.to_command_status(),
            CommandStatus::MessageQueueFull
        );
        assert_eq!(
            SubmitError::Rejected("blocked".into()).to_command_status(),
            CommandStatus::SubmitFailed
        );
    }

    #[test]
    fn submit_request_uses_payload_when_short_message_is_empty() {
        let mut tlvs = TlvMap::new();
        tlvs.insert(tags::MESSAGE_PAYLOAD, Bytes::from_static(b"payload"));
        let pdu = SubmitSm::new(1, "1000", "2000", "")
            .with_source_addr_ton(TypeOfNumber::International)
            .with_tlvs(tlvs);

        let request = SubmitRequest::from_pdu(&pdu, "user1");
        assert_eq!(request.short_message.as_ref(), b"payload");
        assert_eq!(request.source.ton, TypeOfNumber::International);
        assert_eq!(request.destination.value, "2000");
        assert_eq!(request.options.system_id, "user1");
    }
}
