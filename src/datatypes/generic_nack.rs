use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// Negative acknowledgement for a PDU the gateway could not act on: an
/// unsupported command_id, an untrustworthy command_length, a body that did
/// not decode, or a sequence_number that is already outstanding.
///
/// Header only. The sequence_number echoes the offending request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl GenericNack {
    pub fn new(command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }

    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandId, sequence_number)
    }

    pub fn invalid_command_length(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandLength, sequence_number)
    }

    /// A request reused the sequence_number of one still in flight
    pub fn duplicate_sequence(sequence_number: u32) -> Self {
        Self::new(CommandStatus::UnknownError, sequence_number)
    }
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Encodable, Frame, MAX_PDU_SIZE};

    #[test]
    fn invalid_command_length_nack_wire_format() {
        let bytes = GenericNack::invalid_command_length(42).to_bytes().unwrap();

        let expected = [
            0x00, 0x00, 0x00, 0x10, // command_length (16)
            0x80, 0x00, 0x00, 0x00, // generic_nack
            0x00, 0x00, 0x00, 0x02, // ESME_RINVCMDLEN
            0x00, 0x00, 0x00, 0x2A, // sequence_number (42)
        ];
        assert_eq!(bytes.as_ref(), expected);
    }

    #[test]
    fn duplicate_sequence_uses_unknown_error() {
        let nack = GenericNack::duplicate_sequence(789);
        assert_eq!(nack.command_status, CommandStatus::UnknownError);
        assert_eq!(nack.sequence_number, 789);

        let frame = Frame::parse(&nack.to_bytes().unwrap(), MAX_PDU_SIZE).unwrap();
        assert_eq!(frame, Frame::GenericNack(nack));
    }

    #[test]
    fn nack_with_body_is_rejected() {
        let mut bytes = GenericNack::invalid_command_id(5).to_bytes().unwrap().to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        bytes[3] = 0x12;

        let err = Frame::parse(&bytes, MAX_PDU_SIZE).unwrap_err();
        assert!(matches!(err, CodecError::FieldValidation { field: "body", .. }));
        assert_eq!(err.to_command_status(), CommandStatus::InvalidCommandLength);
    }
}
