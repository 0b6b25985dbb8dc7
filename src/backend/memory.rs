use super::{Address, AuthError, Backend, MessageId, SubmitError, SubmitOptions};
use crate::datatypes::InterfaceVersion;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A message accepted by [`InMemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub message_id: MessageId,
    pub system_id: String,
    pub source: Address,
    pub destination: Address,
    pub short_message: Bytes,
}

/// Reference backend that keeps everything in process memory.
///
/// Without a credential table every bind is accepted. Message ids are the
/// hex value of a per-instance counter.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    credentials: Option<HashMap<String, String>>,
    messages: Mutex<Vec<StoredMessage>>,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    /// Accept any system_id / password pair
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the given system_id / password pairs
    pub fn with_credentials<I, S, P>(credentials: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<String>,
    {
        Self {
            credentials: Some(
                credentials
                    .into_iter()
                    .map(|(system_id, password)| (system_id.into(), password.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Snapshot of every accepted message, oldest first
    pub fn messages(&self) -> Vec<StoredMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn authenticate(
        &self,
        system_id: &str,
        password: &str,
        _system_type: &str,
        _interface_version: InterfaceVersion,
    ) -> Result<(), AuthError> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };

        // Unknown system_id and wrong password are indistinguishable to the client
        match credentials.get(system_id) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn submit(
        &self,
        source: &Address,
        destination: &Address,
        short_message: &Bytes,
        options: &SubmitOptions,
    ) -> Result<MessageId, SubmitError> {
        if destination.value.is_empty() {
            return Err(SubmitError::InvalidDestinationAddress);
        }

        let message_id = format!("{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let stored = StoredMessage {
            message_id: message_id.clone(),
            system_id: options.system_id.clone(),
            source: source.clone(),
            destination: destination.clone(),
            short_message: short_message.clone(),
        };

        let mut messages = self
            .messages
            .lock()
            .map_err(|_| SubmitError::Unavailable("message store poisoned".to_string()))?;
        messages.push(stored);

        tracing::info!(
            message_id = %message_id,
            system_id = %options.system_id,
            source = %source.value,
            destination = %destination.value,
            length = short_message.len(),
            "message accepted"
        );

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_backend_accepts_everyone() {
        let backend = InMemoryBackend::new();
        assert!(backend
            .authenticate("anyone", "", "", InterfaceVersion::SmppV34)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn credential_table_is_enforced() {
        let backend = InMemoryBackend::with_credentials([("user1", "pass")]);

        assert!(backend
            .authenticate("user1", "pass", "SMPP", InterfaceVersion::SmppV34)
            .await
            .is_ok());
        assert_eq!(
            backend
                .authenticate("user1", "wrong", "SMPP", InterfaceVersion::SmppV34)
                .await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            backend
                .authenticate("stranger", "pass", "SMPP", InterfaceVersion::SmppV34)
                .await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn submit_records_messages_with_increasing_ids() {
        let backend = InMemoryBackend::new();
        let options = SubmitOptions {
            system_id: "user1".to_string(),
            ..SubmitOptions::default()
        };

        let first = backend
            .submit(
                &Address::new("1000"),
                &Address::new("2000"),
                &Bytes::from_static(b"hi"),
                &options,
            )
            .await
            .unwrap();
        let second = backend
            .submit(
                &Address::new("1000"),
                &Address::new("2001"),
                &Bytes::from_static(b"again"),
                &options,
            )
            .await
            .unwrap();

        assert_eq!(first, "00000001");
        assert_eq!(second, "00000002");

        let messages = backend.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].system_id, "user1");
        assert_eq!(messages[1].destination.value, "2001");
    }

    #[tokio::test]
    async fn empty_destination_is_rejected() {
        let backend = InMemoryBackend::new();
        let result = backend
            .submit(
                &Address::new("1000"),
                &Address::new(""),
                &Bytes::new(),
                &SubmitOptions::default(),
            )
            .await;
        assert_eq!(result, Err(SubmitError::InvalidDestinationAddress));
    }
}
