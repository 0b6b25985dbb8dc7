// ABOUTME: bind_transmitter / bind_receiver / bind_transceiver and their responses
// ABOUTME: The three variants share one body layout, so they share one struct keyed by BindType

use crate::codec::{
    decode_cstring, decode_enum, decode_u8, encode_cstring, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TlvMap, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

// C-Octet string limits, terminator included
pub const MAX_SYSTEM_ID_LENGTH: usize = 16;
pub const MAX_PASSWORD_LENGTH: usize = 9;
pub const MAX_SYSTEM_TYPE_LENGTH: usize = 13;
pub const MAX_ADDRESS_RANGE_LENGTH: usize = 41;

/// Role requested by a bind, which decides what the session may do once bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindType {
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindType {
    pub fn request_id(self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_id(self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    /// Map either a bind request or a bind response id back to its role
    pub fn from_command_id(command_id: CommandId) -> Option<Self> {
        match command_id {
            CommandId::BindTransmitter | CommandId::BindTransmitterResp => {
                Some(BindType::Transmitter)
            }
            CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindType::Receiver),
            CommandId::BindTransceiver | CommandId::BindTransceiverResp => {
                Some(BindType::Transceiver)
            }
            _ => None,
        }
    }

    /// Whether a session bound with this role may submit messages
    pub fn can_transmit(self) -> bool {
        matches!(self, BindType::Transmitter | BindType::Transceiver)
    }

    pub fn request_name(self) -> &'static str {
        match self {
            BindType::Transmitter => "bind_transmitter",
            BindType::Receiver => "bind_receiver",
            BindType::Transceiver => "bind_transceiver",
        }
    }

    pub fn response_name(self) -> &'static str {
        match self {
            BindType::Transmitter => "bind_transmitter_resp",
            BindType::Receiver => "bind_receiver_resp",
            BindType::Transceiver => "bind_transceiver_resp",
        }
    }
}

/// Bind request from an ESME.
#[derive(Clone, Debug, PartialEq)]
pub struct Bind {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.1 system_id: identification of the ESME requesting to bind.
    pub system_id: String,

    /// 5.2.2 password: used by the SMSC to authenticate the ESME. May be empty.
    pub password: String,

    /// 5.2.3 system_type: categorises the ESME, e.g. "VMS" or "OTA".
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served via this session.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es).
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: range of SME addresses serviced by the ESME.
    pub address_range: String,
}

impl Bind {
    pub fn new(
        bind_type: BindType,
        sequence_number: u32,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            bind_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_address_range(mut self, address_range: impl Into<String>) -> Self {
        self.address_range = address_range.into();
        self
    }

    builder_setters! {
        with_interface_version => interface_version: InterfaceVersion,
        with_addr_ton => addr_ton: TypeOfNumber,
        with_addr_npi => addr_npi: NumericPlanIndicator,
    }
}

impl Encodable for Bind {
    fn command_id(&self) -> CommandId {
        self.bind_type.request_id()
    }

    fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        encode_cstring(buf, &self.password, MAX_PASSWORD_LENGTH, "password")?;
        encode_cstring(buf, &self.system_type, MAX_SYSTEM_TYPE_LENGTH, "system_type")?;
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(
            buf,
            &self.address_range,
            MAX_ADDRESS_RANGE_LENGTH,
            "address_range",
        )
    }
}

impl Decodable for Bind {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let bind_type = match BindType::from_command_id(header.command_id) {
            Some(bind_type) if !header.command_id.is_response() => bind_type,
            _ => {
                return Err(CodecError::UnexpectedCommandId {
                    expected: "bind",
                    actual: header.command_id,
                });
            }
        };

        let system_id = decode_cstring(buf, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        let password = decode_cstring(buf, MAX_PASSWORD_LENGTH, "password")?;
        let system_type = decode_cstring(buf, MAX_SYSTEM_TYPE_LENGTH, "system_type")?;
        let interface_version = InterfaceVersion::from(decode_u8(buf, "interface_version")?);
        let addr_ton = decode_enum(buf, "addr_ton")?;
        let addr_npi = decode_enum(buf, "addr_npi")?;
        let address_range = decode_cstring(buf, MAX_ADDRESS_RANGE_LENGTH, "address_range")?;

        if buf.has_remaining() {
            return Err(CodecError::FieldValidation {
                field: "body",
                reason: format!("{} octets after address_range", buf.remaining()),
            });
        }

        Ok(Bind {
            bind_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

/// Response to a bind. A negative response carries no body.
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// Identifies the SMSC (here, the gateway) to the bound ESME
    pub system_id: String,

    /// Optional parameters; sc_interface_version is the only one defined for bind_resp
    pub tlvs: TlvMap,
}

impl BindResponse {
    /// Successful response advertising SMPP v3.4
    pub fn new(bind_type: BindType, sequence_number: u32, system_id: impl Into<String>) -> Self {
        let mut tlvs = TlvMap::new();
        tlvs.set_u8(tags::SC_INTERFACE_VERSION, InterfaceVersion::SmppV34 as u8);

        Self {
            bind_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            tlvs,
        }
    }

    pub fn error(bind_type: BindType, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            bind_type,
            command_status: status,
            sequence_number,
            system_id: String::new(),
            tlvs: TlvMap::new(),
        }
    }
}

impl Encodable for BindResponse {
    fn command_id(&self) -> CommandId {
        self.bind_type.response_id()
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
        encode_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        self.tlvs.encode(buf)
    }
}

impl Decodable for BindResponse {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let bind_type = match BindType::from_command_id(header.command_id) {
            Some(bind_type) if header.command_id.is_response() => bind_type,
            _ => {
                return Err(CodecError::UnexpectedCommandId {
                    expected: "bind_resp",
                    actual: header.command_id,
                });
            }
        };

        if !buf.has_remaining() {
            return Ok(BindResponse {
                bind_type,
                command_status: header.command_status,
                sequence_number: header.sequence_number,
                system_id: String::new(),
                tlvs: TlvMap::new(),
            });
        }

        let system_id = decode_cstring(buf, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        let tlvs = TlvMap::decode(buf)?;

        Ok(BindResponse {
            bind_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            tlvs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Frame, MAX_PDU_SIZE};

    #[test]
    fn bind_types_map_to_command_ids() {
        assert_eq!(
            BindType::from_command_id(CommandId::BindReceiverResp),
            Some(BindType::Receiver)
        );
        assert_eq!(BindType::from_command_id(CommandId::SubmitSm), None);
        assert!(BindType::Transceiver.can_transmit());
        assert!(!BindType::Receiver.can_transmit());
        assert_eq!(
            BindType::Transceiver.response_id(),
            CommandId::BindTransceiverResp
        );
    }

    #[test]
    fn encode_rejects_overlong_password() {
        let bind = Bind::new(BindType::Transmitter, 1, "user1", "123456789");
        let result = bind.to_bytes();
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn decode_overlong_system_id_maps_to_invalid_system_id() {
        let mut body = BytesMut::new();
        body.put_slice(b"abcdefghijklmnopq\0"); // 17 characters
        body.put_slice(b"\0\0");
        body.put_slice(&[0x34, 0x00, 0x00, 0x00]);

        let mut pdu = BytesMut::new();
        PduHeader {
            command_length: (PduHeader::SIZE + body.len()) as u32,
            command_id: CommandId::BindTransmitter,
            command_status: CommandStatus::Ok,
            sequence_number: 1,
        }
        .encode(&mut pdu);
        pdu.put_slice(&body);

        let err = Frame::parse(&pdu, MAX_PDU_SIZE).unwrap_err();
        assert_eq!(err.to_command_status(), CommandStatus::InvalidSystemId);
    }

    #[test]
    fn decode_rejects_reserved_ton() {
        let bind = Bind::new(BindType::Receiver, 9, "user1", "pass");
        let mut bytes = BytesMut::from(bind.to_bytes().unwrap().as_ref());
        // addr_ton sits just after system_id, password, system_type and interface_version
        let addr_ton_offset = PduHeader::SIZE + "user1\0pass\0\0".len() + 1;
        bytes[addr_ton_offset] = 0x07;

        let err = Frame::parse(&bytes, MAX_PDU_SIZE).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldValidation {
                field: "addr_ton",
                ..
            }
        ));
    }

    #[test]
    fn bind_resp_advertises_interface_version() {
        let resp = BindResponse::new(BindType::Transceiver, 4, "smpp-gateway");
        let bytes = resp.to_bytes().unwrap();

        match Frame::parse(&bytes, MAX_PDU_SIZE).unwrap() {
            Frame::BindResp(decoded) => {
                assert_eq!(decoded.system_id, "smpp-gateway");
                assert_eq!(decoded.tlvs.sc_interface_version(), Some(0x34));
                assert_eq!(decoded.bind_type, BindType::Transceiver);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn negative_bind_resp_has_no_body() {
        let resp = BindResponse::error(BindType::Transmitter, 2, CommandStatus::BindFailed);
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes.len(), PduHeader::SIZE);
    }
}
