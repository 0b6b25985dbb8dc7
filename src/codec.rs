// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// Each PDU implements Encodable/Decodable; the registry maps a command_id to
// its decoder. Decoding only ever sees one whole frame: the caller slices
// exactly `command_length` bytes off the stream before handing them over.

use crate::datatypes::{
    Bind, BindResponse, CommandId, CommandStatus, EnquireLink, EnquireLinkResponse, GenericNack,
    SubmitSm, SubmitSmResponse, Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;
use thiserror::Error;

/// Default upper bound for `command_length`
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>, max_pdu_size: u32) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status_raw = buf.get_u32();
        let sequence_number = buf.get_u32();

        check_length(command_length, max_pdu_size)?;

        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::UnknownCommandId(command_id_raw))?;
        let command_status = CommandStatus::try_from(command_status_raw)
            .map_err(|_| CodecError::InvalidCommandStatus(command_status_raw))?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status as u32);
        buf.put_u32(self.sequence_number);
    }
}

fn check_length(command_length: u32, max_pdu_size: u32) -> Result<(), CodecError> {
    if command_length < PduHeader::SIZE as u32 || command_length > max_pdu_size {
        return Err(CodecError::InvalidLength {
            length: command_length,
            min: PduHeader::SIZE as u32,
            max: max_pdu_size,
        });
    }
    Ok(())
}

/// Trait for types that can be encoded to bytes
///
/// Implementors only write their body; `encode` frames it with a header whose
/// `command_length` is always computed from what was actually written.
pub trait Encodable {
    fn command_id(&self) -> CommandId;

    fn command_status(&self) -> CommandStatus;

    fn sequence_number(&self) -> u32;

    /// Encode the mandatory fields followed by the optional parameters
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encode this PDU to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let start = buf.len();
        PduHeader {
            command_length: 0,
            command_id: self.command_id(),
            command_status: self.command_status(),
            sequence_number: self.sequence_number(),
        }
        .encode(buf);

        if let Err(err) = self.encode_body(buf) {
            buf.truncate(start);
            return Err(err);
        }

        let length = (buf.len() - start) as u32;
        buf[start..start + 4].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }

    /// Convert this PDU to bytes (convenience method)
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header. The cursor ends where the
    /// frame ends.
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidLength { length: u32, min: u32, max: u32 },

    #[error("Unknown command_id: {0:#010x}")]
    UnknownCommandId(u32),

    #[error("Unexpected command_id {actual:?} for {expected} PDU")]
    UnexpectedCommandId {
        expected: &'static str,
        actual: CommandId,
    },

    #[error("Invalid command_status: {0:#x}")]
    InvalidCommandStatus(u32),

    #[error("TLV {tag:#06x} declares {length} octets but only {remaining} remain")]
    TlvLengthOverflow {
        tag: u16,
        length: usize,
        remaining: usize,
    },

    #[error("Truncated TLV header: {remaining} octets left in PDU")]
    TruncatedTlv { remaining: usize },

    #[error("Missing mandatory field '{0}'")]
    MissingMandatoryField(&'static str),

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::MissingMandatoryField("short_message") => CommandStatus::InvalidMsgLength,
            CodecError::MissingMandatoryField(_) => CommandStatus::InvalidCommandLength,
            CodecError::UnknownCommandId(_) | CodecError::UnexpectedCommandId { .. } => {
                CommandStatus::InvalidCommandId
            }
            CodecError::TlvLengthOverflow { .. } | CodecError::TruncatedTlv { .. } => {
                CommandStatus::InvalidParameterLength
            }
            CodecError::FieldValidation { field, .. } => match *field {
                "system_id" => CommandStatus::InvalidSystemId,
                "password" => CommandStatus::InvalidPassword,
                "system_type" => CommandStatus::InvalidSystemType,
                "service_type" => CommandStatus::InvalidServiceType,
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "source_addr_ton" => CommandStatus::InvalidSourceAddressTon,
                "source_addr_npi" => CommandStatus::InvalidSourceAddressNpi,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "dest_addr_ton" => CommandStatus::InvalidDestinationAddressTon,
                "dest_addr_npi" => CommandStatus::InvalidDestinationAddressNpi,
                "priority_flag" => CommandStatus::InvalidPriorityFlag,
                "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
                "validity_period" => CommandStatus::InvalidExpiryTime,
                "short_message" => CommandStatus::InvalidMsgLength,
                "tlv" => CommandStatus::InvalidOptionalParameterValue,
                "body" => CommandStatus::InvalidCommandLength,
                _ => CommandStatus::SystemError,
            },
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-Octet string of at most `max_len` octets, terminator included.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let available = &buf.chunk()[..buf.remaining().min(max_len)];

    let end = match available.iter().position(|&b| b == 0) {
        Some(end) => end,
        None if buf.remaining() < max_len => {
            return Err(CodecError::MissingMandatoryField(field_name));
        }
        None => {
            return Err(CodecError::FieldValidation {
                field: field_name,
                reason: format!("not terminated within {max_len} octets"),
            });
        }
    };

    let value = std::str::from_utf8(&available[..end])
        .map(str::to_owned)
        .map_err(|e| CodecError::Utf8Error {
            field: field_name,
            source: e,
        })?;

    buf.advance(end + 1);
    Ok(value)
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field_name: &'static str) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::MissingMandatoryField(field_name));
    }
    Ok(buf.get_u8())
}

/// Decode a single byte into one of the `num_enum` field types
pub fn decode_enum<T>(buf: &mut Cursor<&[u8]>, field_name: &'static str) -> Result<T, CodecError>
where
    T: TryFrom<u8>,
{
    let raw = decode_u8(buf, field_name)?;
    T::try_from(raw).map_err(|_| CodecError::FieldValidation {
        field: field_name,
        reason: format!("unsupported value {raw:#04x}"),
    })
}

/// Encode a C-Octet string; `max_len` includes the terminator.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field_name: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("{} octets, limit is {}", value.len(), max_len - 1),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "embedded NUL".to_string(),
        });
    }

    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Peek at the sequence number of a buffered frame, if its header is present
pub fn peek_sequence_number(buf: &[u8]) -> Option<u32> {
    let raw: [u8; 4] = buf.get(12..16)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

/// Generic frame type that can hold any PDU the gateway handles
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    // Session management PDUs
    Bind(Bind),
    BindResp(BindResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),

    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    GenericNack(GenericNack),

    // Unrecognised or reserved command ids; the body is kept opaque
    Unknown {
        command_id: u32,
        command_status: u32,
        sequence_number: u32,
        body: Bytes,
    },
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

static REGISTRY: LazyLock<PduRegistry> = LazyLock::new(PduRegistry::new);

impl PduRegistry {
    /// Create a new registry with every PDU the gateway decodes
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu::<EnquireLink, _>(CommandId::EnquireLink, Frame::EnquireLink);
        registry
            .register_pdu::<EnquireLinkResponse, _>(CommandId::EnquireLinkResp, Frame::EnquireLinkResp);
        registry.register_pdu::<Unbind, _>(CommandId::Unbind, Frame::Unbind);
        registry.register_pdu::<UnbindResponse, _>(CommandId::UnbindResp, Frame::UnbindResp);
        registry.register_pdu::<GenericNack, _>(CommandId::GenericNack, Frame::GenericNack);

        for command_id in [
            CommandId::BindTransmitter,
            CommandId::BindReceiver,
            CommandId::BindTransceiver,
        ] {
            registry.register_pdu::<Bind, _>(command_id, Frame::Bind);
        }
        for command_id in [
            CommandId::BindTransmitterResp,
            CommandId::BindReceiverResp,
            CommandId::BindTransceiverResp,
        ] {
            registry.register_pdu::<BindResponse, _>(command_id, Frame::BindResp);
        }

        // Large struct, boxed
        registry.register_pdu::<SubmitSm, _>(CommandId::SubmitSm, |pdu| {
            Frame::SubmitSm(Box::new(pdu))
        });
        registry.register_pdu::<SubmitSmResponse, _>(CommandId::SubmitSmResp, Frame::SubmitSmResp);

        registry
    }

    fn register_pdu<T, F>(&mut self, command_id: CommandId, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(command_id, decoder);
    }

    /// Decode a PDU given its header and body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => {
                // Known but reserved (deliver_sm): carried opaque, like unknown ids
                let body = buf.copy_to_bytes(buf.remaining());
                tracing::debug!(
                    command_id = ?header.command_id,
                    "no decoder registered, treating body as opaque"
                );

                Ok(Frame::Unknown {
                    command_id: header.command_id as u32,
                    command_status: header.command_status as u32,
                    sequence_number: header.sequence_number,
                    body,
                })
            }
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }

    /// Get all registered command_ids
    pub fn registered_commands(&self) -> Vec<CommandId> {
        self.decoders.keys().copied().collect()
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Raw command_id for this frame
    pub fn command_id(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.command_id() as u32,
            Frame::BindResp(pdu) => pdu.command_id() as u32,
            Frame::Unbind(_) => CommandId::Unbind as u32,
            Frame::UnbindResp(_) => CommandId::UnbindResp as u32,
            Frame::SubmitSm(_) => CommandId::SubmitSm as u32,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp as u32,
            Frame::EnquireLink(_) => CommandId::EnquireLink as u32,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp as u32,
            Frame::GenericNack(_) => CommandId::GenericNack as u32,
            Frame::Unknown { command_id, .. } => *command_id,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.sequence_number,
            Frame::BindResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    /// Raw command_status for this frame
    pub fn command_status(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.command_status as u32,
            Frame::BindResp(pdu) => pdu.command_status as u32,
            Frame::Unbind(pdu) => pdu.command_status as u32,
            Frame::UnbindResp(pdu) => pdu.command_status as u32,
            Frame::SubmitSm(pdu) => pdu.command_status as u32,
            Frame::SubmitSmResp(pdu) => pdu.command_status as u32,
            Frame::EnquireLink(pdu) => pdu.command_status as u32,
            Frame::EnquireLinkResp(pdu) => pdu.command_status as u32,
            Frame::GenericNack(pdu) => pdu.command_status as u32,
            Frame::Unknown { command_status, .. } => *command_status,
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id() & 0x8000_0000 != 0
    }

    /// Human readable command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Bind(pdu) => pdu.bind_type.request_name(),
            Frame::BindResp(pdu) => pdu.bind_type.response_name(),
            Frame::Unbind(_) => "unbind",
            Frame::UnbindResp(_) => "unbind_resp",
            Frame::SubmitSm(_) => "submit_sm",
            Frame::SubmitSmResp(_) => "submit_sm_resp",
            Frame::EnquireLink(_) => "enquire_link",
            Frame::EnquireLinkResp(_) => "enquire_link_resp",
            Frame::GenericNack(_) => "generic_nack",
            Frame::Unknown { .. } => "unknown",
        }
    }

    /// Encode this frame, header included, into `buf`
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Frame::Bind(pdu) => pdu.encode(buf),
            Frame::BindResp(pdu) => pdu.encode(buf),
            Frame::Unbind(pdu) => pdu.encode(buf),
            Frame::UnbindResp(pdu) => pdu.encode(buf),
            Frame::SubmitSm(pdu) => pdu.encode(buf),
            Frame::SubmitSmResp(pdu) => pdu.encode(buf),
            Frame::EnquireLink(pdu) => pdu.encode(buf),
            Frame::EnquireLinkResp(pdu) => pdu.encode(buf),
            Frame::GenericNack(pdu) => pdu.encode(buf),
            Frame::Unknown {
                command_id,
                command_status,
                sequence_number,
                body,
            } => {
                buf.put_u32((PduHeader::SIZE + body.len()) as u32);
                buf.put_u32(*command_id);
                buf.put_u32(*command_status);
                buf.put_u32(*sequence_number);
                buf.put_slice(body);
                Ok(())
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Check whether `buf` starts with a whole frame.
    ///
    /// The length is judged as soon as its 4 bytes are buffered: an
    /// impossible command_length is an error even if the rest of the header
    /// never arrives. Returns the frame length on success.
    pub fn check(buf: &mut Cursor<&[u8]>, max_pdu_size: u32) -> Result<usize, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::Incomplete);
        }

        // Peek at command_length without advancing cursor
        let pos = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(pos);

        check_length(command_length, max_pdu_size)?;

        if buf.remaining() < PduHeader::SIZE || buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse one whole frame. Only the first `command_length` bytes of `buf`
    /// are ever looked at.
    pub fn parse(buf: &[u8], max_pdu_size: u32) -> Result<Frame, CodecError> {
        let len = Frame::check(&mut Cursor::new(buf), max_pdu_size)?;
        let frame = &buf[..len];

        let mut cursor = Cursor::new(frame);
        match PduHeader::decode(&mut cursor, max_pdu_size) {
            Ok(header) => REGISTRY.decode_pdu(header, &mut cursor),
            Err(CodecError::UnknownCommandId(command_id)) => {
                tracing::warn!(
                    "Unknown PDU command_id: {:#x}, treating as opaque data",
                    command_id
                );
                Ok(Frame::Unknown {
                    command_id,
                    command_status: u32::from_be_bytes([frame[8], frame[9], frame[10], frame[11]]),
                    sequence_number: u32::from_be_bytes([
                        frame[12], frame[13], frame[14], frame[15],
                    ]),
                    body: Bytes::copy_from_slice(&frame[PduHeader::SIZE..]),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Decode the first frame in `buf`, returning it with the number of bytes
    /// it occupied. `CodecError::Incomplete` means more bytes are needed.
    pub fn decode(buf: &[u8], max_pdu_size: u32) -> Result<(Frame, usize), CodecError> {
        let len = Frame::check(&mut Cursor::new(buf), max_pdu_size)?;
        let frame = Frame::parse(&buf[..len], max_pdu_size)?;
        Ok((frame, len))
    }
}
