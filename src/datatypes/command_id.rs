use num_enum::TryFromPrimitive;

/// Commands understood by the gateway.
///
/// Anything outside this set still parses at the header level and is carried
/// as an opaque [`Frame::Unknown`](crate::codec::Frame::Unknown), which the
/// session answers with `generic_nack`.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    // Receiving-direction delivery is reserved: the ids are known, but no
    // decoder is registered for them.
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        (*self as u32) & 0x8000_0000 != 0
    }

    /// The response command paired with a request command.
    pub fn response(&self) -> Option<CommandId> {
        if self.is_response() {
            return None;
        }
        CommandId::try_from(*self as u32 | 0x8000_0000).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_is_response() {
        assert!(!CommandId::EnquireLink.is_response());
        assert!(CommandId::EnquireLinkResp.is_response());
        assert!(!CommandId::SubmitSm.is_response());
        assert!(CommandId::SubmitSmResp.is_response());
        assert!(CommandId::GenericNack.is_response());
    }

    #[test]
    fn response_pairs() {
        assert_eq!(
            CommandId::BindTransceiver.response(),
            Some(CommandId::BindTransceiverResp)
        );
        assert_eq!(CommandId::Unbind.response(), Some(CommandId::UnbindResp));
        assert_eq!(CommandId::SubmitSmResp.response(), None);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        assert!(CommandId::try_from(0x0000_0003).is_err()); // query_sm
        assert!(CommandId::try_from(0x0000_000A).is_err()); // reserved
    }
}
