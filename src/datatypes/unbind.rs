use crate::datatypes::CommandId;
use crate::datatypes::CommandStatus;
use crate::macros::impl_complete_header_only_pdu;

/// The purpose of the SMPP unbind operation is to deregister an instance of an ESME from the SMSC
/// and inform the SMSC that the ESME no longer wishes to use this network connection for the
/// submission or delivery of messages.
///
/// Thus, the unbind operation may be viewed as a form of SMSC logoff request to close the current
/// SMPP session. The gateway also sends it when it tears down a bound session itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Unbind {
    // pub command_length: u32,
    // pub command_id: CommandId::Unbind,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnbindResponse {
    // pub command_length: u32,
    // pub command_id: CommandId::UnbindResp,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(Unbind, CommandId::Unbind);
impl_complete_header_only_pdu!(UnbindResponse, CommandId::UnbindResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn unbind_resp_error_status_is_encoded() {
        let bytes = UnbindResponse::error(3, CommandStatus::InvalidBindStatus)
            .to_bytes()
            .unwrap();

        assert_eq!(&bytes[4..8], &[0x80, 0x00, 0x00, 0x06]);
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x00, 0x04]);
    }

    #[test]
    fn decode_rejects_foreign_command_id() {
        let header = PduHeader {
            command_length: 16,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 1,
        };
        let mut cursor = Cursor::new(&[][..]);

        assert!(matches!(
            Unbind::decode(header, &mut cursor),
            Err(CodecError::UnexpectedCommandId { .. })
        ));
    }
}
