use crate::codec::{
    decode_cstring, decode_enum, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, NumericPlanIndicator, PriorityFlag, TlvMap, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

// C-Octet string limits, terminator included
pub const MAX_SERVICE_TYPE_LENGTH: usize = 6;
pub const MAX_ADDRESS_LENGTH: usize = 21;
pub const MAX_TIME_LENGTH: usize = 17;
pub const MAX_MESSAGE_ID_LENGTH: usize = 65;

/// Longest short_message that fits the one-octet sm_length field
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// This operation is used by an ESME to submit a short message to the SMSC for onward transmission
/// to a specified short message entity (SME).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    // pub command_length: u32,
    // pub command_id: CommandId::SubmitSm,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.1.1 service_type: SMS application service associated with the message. Empty for default.
    pub service_type: String,

    /// 4.1.2 source_addr_ton: Type of Number for source address.
    pub source_addr_ton: TypeOfNumber,

    /// 4.1.3 source_addr_npi: Numbering Plan Indicator for source address.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.1.4 source_addr: Address of SME which originated this message.
    pub source_addr: String,

    /// 4.1.5 dest_addr_ton: Type of Number for destination address.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.1.6 dest_addr_npi: Numbering Plan Indicator for destination address.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.1.7 destination_addr: Destination address of this short message.
    pub destination_addr: String,

    /// 4.1.8 esm_class: Message Mode and Message Type bits.
    pub esm_class: u8,

    /// 4.1.9 protocol_id: Protocol Identifier. Network specific field.
    pub protocol_id: u8,

    /// 4.1.10 priority_flag: Designates the priority level of the message.
    pub priority_flag: PriorityFlag,

    /// 4.1.11 schedule_delivery_time: Empty for immediate delivery.
    pub schedule_delivery_time: String,

    /// 4.1.12 validity_period: Empty to request the SMSC default validity period.
    pub validity_period: String,

    /// 4.1.13 registered_delivery: delivery receipt / acknowledgement request bits.
    pub registered_delivery: u8,

    /// 4.1.14 replace_if_present_flag
    pub replace_if_present_flag: u8,

    /// 4.1.15 data_coding: Defines the encoding scheme of the short message user data.
    pub data_coding: u8,

    /// 4.1.16 sm_default_msg_id: Index of a predefined ('canned') short message.
    pub sm_default_msg_id: u8,

    /// 4.1.18 short_message: Up to 254 octets of user data. sm_length is derived from it.
    pub short_message: Bytes,

    // Optional parameters
    pub tlvs: TlvMap,
}

impl SubmitSm {
    pub fn new(
        sequence_number: u32,
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
        short_message: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.into(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: destination_addr.into(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: PriorityFlag::Level0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::copy_from_slice(short_message.as_ref()),
            tlvs: TlvMap::new(),
        }
    }

    builder_setters! {
        with_service_type => service_type: String,
        with_source_addr_ton => source_addr_ton: TypeOfNumber,
        with_source_addr_npi => source_addr_npi: NumericPlanIndicator,
        with_dest_addr_ton => dest_addr_ton: TypeOfNumber,
        with_dest_addr_npi => dest_addr_npi: NumericPlanIndicator,
        with_esm_class => esm_class: u8,
        with_priority_flag => priority_flag: PriorityFlag,
        with_registered_delivery => registered_delivery: u8,
        with_data_coding => data_coding: u8,
        with_tlvs => tlvs: TlvMap,
    }

    /// The user data to deliver: short_message, or the message_payload TLV
    /// when short_message is empty.
    pub fn message(&self) -> &Bytes {
        match self.tlvs.message_payload() {
            Some(payload) if self.short_message.is_empty() => payload,
            _ => &self.short_message,
        }
    }
}

impl Encodable for SubmitSm {
    fn command_id(&self) -> CommandId {
        CommandId::SubmitSm
    }

    fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!(
                    "{} octets, limit is {MAX_SHORT_MESSAGE_LENGTH}",
                    self.short_message.len()
                ),
            });
        }

        encode_cstring(buf, &self.service_type, MAX_SERVICE_TYPE_LENGTH, "service_type")?;
        buf.put_u8(self.source_addr_ton as u8);
        buf.put_u8(self.source_addr_npi as u8);
        encode_cstring(buf, &self.source_addr, MAX_ADDRESS_LENGTH, "source_addr")?;
        buf.put_u8(self.dest_addr_ton as u8);
        buf.put_u8(self.dest_addr_npi as u8);
        encode_cstring(buf, &self.destination_addr, MAX_ADDRESS_LENGTH, "destination_addr")?;
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag as u8);
        encode_cstring(
            buf,
            &self.schedule_delivery_time,
            MAX_TIME_LENGTH,
            "schedule_delivery_time",
        )?;
        encode_cstring(buf, &self.validity_period, MAX_TIME_LENGTH, "validity_period")?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.short_message.len() as u8);
        buf.put_slice(&self.short_message);

        self.tlvs.encode(buf)
    }
}

impl Decodable for SubmitSm {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if header.command_id != CommandId::SubmitSm {
            return Err(CodecError::UnexpectedCommandId {
                expected: "submit_sm",
                actual: header.command_id,
            });
        }

        let service_type = decode_cstring(buf, MAX_SERVICE_TYPE_LENGTH, "service_type")?;
        let source_addr_ton = decode_enum(buf, "source_addr_ton")?;
        let source_addr_npi = decode_enum(buf, "source_addr_npi")?;
        let source_addr = decode_cstring(buf, MAX_ADDRESS_LENGTH, "source_addr")?;
        let dest_addr_ton = decode_enum(buf, "dest_addr_ton")?;
        let dest_addr_npi = decode_enum(buf, "dest_addr_npi")?;
        let destination_addr = decode_cstring(buf, MAX_ADDRESS_LENGTH, "destination_addr")?;
        let esm_class = decode_u8(buf, "esm_class")?;
        let protocol_id = decode_u8(buf, "protocol_id")?;
        let priority_flag = decode_enum(buf, "priority_flag")?;
        let schedule_delivery_time =
            decode_cstring(buf, MAX_TIME_LENGTH, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, MAX_TIME_LENGTH, "validity_period")?;
        let registered_delivery = decode_u8(buf, "registered_delivery")?;
        let replace_if_present_flag = decode_u8(buf, "replace_if_present_flag")?;
        let data_coding = decode_u8(buf, "data_coding")?;
        let sm_default_msg_id = decode_u8(buf, "sm_default_msg_id")?;

        let sm_length = decode_u8(buf, "sm_length")? as usize;
        if sm_length > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!("sm_length {sm_length} exceeds {MAX_SHORT_MESSAGE_LENGTH}"),
            });
        }
        if buf.remaining() < sm_length {
            return Err(CodecError::MissingMandatoryField("short_message"));
        }
        let short_message = buf.copy_to_bytes(sm_length);

        let tlvs = TlvMap::decode(buf)?;

        Ok(SubmitSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            tlvs,
        })
    }
}

/// Response to submit_sm. A negative response carries no body.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    // pub command_length: u32,
    // pub command_id: CommandId::SubmitSmResp,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 4.4.2 message_id: the identifier the SMSC (here, the backend) assigned to the message.
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for SubmitSmResponse {
    fn command_id(&self) -> CommandId {
        CommandId::SubmitSmResp
    }

    fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if !self.command_status.is_ok() {
            return Ok(());
        }
        encode_cstring(buf, &self.message_id, MAX_MESSAGE_ID_LENGTH, "message_id")
    }
}

impl Decodable for SubmitSmResponse {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if header.command_id != CommandId::SubmitSmResp {
            return Err(CodecError::UnexpectedCommandId {
                expected: "submit_sm_resp",
                actual: header.command_id,
            });
        }

        let message_id = if buf.has_remaining() {
            decode_cstring(buf, MAX_MESSAGE_ID_LENGTH, "message_id")?
        } else {
            String::new()
        };

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Frame, MAX_PDU_SIZE};
    use crate::datatypes::tags;

    #[test]
    fn submit_sm_to_bytes_basic() {
        let submit_sm = SubmitSm::new(1, "1000", "2000", "hi");
        let bytes = submit_sm.to_bytes().unwrap();

        let expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x2B, // command_length = 43
            0x00, 0x00, 0x00, 0x04, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
            0x00, // service_type
            0x00, 0x00, // source_addr_ton, source_addr_npi
            b'1', b'0', b'0', b'0', 0x00, // source_addr
            0x00, 0x00, // dest_addr_ton, dest_addr_npi
            b'2', b'0', b'0', b'0', 0x00, // destination_addr
            0x00, 0x00, 0x00, // esm_class, protocol_id, priority_flag
            0x00, // schedule_delivery_time
            0x00, // validity_period
            0x00, 0x00, 0x00, 0x00, // registered_delivery .. sm_default_msg_id
            0x02, b'h', b'i', // sm_length, short_message
        ];

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_with_tlvs_roundtrip() {
        let mut tlvs = TlvMap::new();
        tlvs.set_u16(tags::USER_MESSAGE_REFERENCE, 0x1234);
        tlvs.set_u16(tags::SAR_MSG_REF_NUM, 1);
        tlvs.set_u8(tags::SAR_TOTAL_SEGMENTS, 2);
        tlvs.set_u8(tags::SAR_SEGMENT_SEQNUM, 1);

        let original = SubmitSm::new(7, "1000", "2000", "part one")
            .with_source_addr_ton(TypeOfNumber::International)
            .with_source_addr_npi(NumericPlanIndicator::Isdn)
            .with_priority_flag(PriorityFlag::Level2)
            .with_tlvs(tlvs);

        let bytes = original.to_bytes().unwrap();
        match Frame::parse(&bytes, MAX_PDU_SIZE).unwrap() {
            Frame::SubmitSm(decoded) => {
                assert_eq!(*decoded, original);
                assert_eq!(decoded.tlvs.user_message_reference(), Some(0x1234));
                assert_eq!(decoded.tlvs.sar_total_segments(), Some(2));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn message_falls_back_to_payload() {
        let mut tlvs = TlvMap::new();
        tlvs.insert(tags::MESSAGE_PAYLOAD, Bytes::from_static(b"long payload"));

        let submit = SubmitSm::new(1, "1000", "2000", "").with_tlvs(tlvs.clone());
        assert_eq!(submit.message().as_ref(), b"long payload");

        let submit = SubmitSm::new(1, "1000", "2000", "short").with_tlvs(tlvs);
        assert_eq!(submit.message().as_ref(), b"short");
    }

    #[test]
    fn encode_rejects_oversized_short_message() {
        let submit = SubmitSm::new(1, "1000", "2000", vec![b'a'; 255]);
        let err = submit.to_bytes().unwrap_err();
        assert_eq!(err.to_command_status(), CommandStatus::InvalidMsgLength);
    }

    #[test]
    fn sm_length_past_end_of_frame_is_missing_field() {
        let bytes = SubmitSm::new(1, "1000", "2000", "hi").to_bytes().unwrap();
        let mut tampered = BytesMut::from(bytes.as_ref());
        let sm_length_offset = tampered.len() - 3;
        tampered[sm_length_offset] = 10;

        let err = Frame::parse(&tampered, MAX_PDU_SIZE).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MissingMandatoryField("short_message")
        ));
        assert_eq!(err.to_command_status(), CommandStatus::InvalidMsgLength);
    }

    #[test]
    fn tlv_overflow_inside_submit_sm() {
        let bytes = SubmitSm::new(1, "1000", "2000", "hi").to_bytes().unwrap();
        let mut tampered = BytesMut::from(bytes.as_ref());
        // tag 0x0204, declared length 8, only 2 value octets present
        tampered.put_slice(&[0x02, 0x04, 0x00, 0x08, 0x00, 0x01]);
        let length = tampered.len() as u32;
        tampered[..4].copy_from_slice(&length.to_be_bytes());

        let err = Frame::parse(&tampered, MAX_PDU_SIZE).unwrap_err();
        assert!(matches!(err, CodecError::TlvLengthOverflow { tag: 0x0204, .. }));
        assert_eq!(err.to_command_status(), CommandStatus::InvalidParameterLength);
    }

    #[test]
    fn submit_sm_response_to_bytes() {
        let resp = SubmitSmResponse::new(3, "abc123");
        let bytes = resp.to_bytes().unwrap();

        assert_eq!(bytes.len(), PduHeader::SIZE + 7);
        assert_eq!(&bytes[PduHeader::SIZE..], b"abc123\0");
    }

    #[test]
    fn submit_sm_response_with_error_status_has_no_body() {
        let resp = SubmitSmResponse::error(3, CommandStatus::InvalidBindStatus);
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes.len(), PduHeader::SIZE);

        match Frame::parse(&bytes, MAX_PDU_SIZE).unwrap() {
            Frame::SubmitSmResp(decoded) => assert_eq!(decoded, resp),
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
