// ABOUTME: Optional parameter (TLV) storage for SMPP PDU bodies
// ABOUTME: Keeps tags in insertion order and exposes typed accessors for the tags the gateway reads

use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Optional parameter tags (SMPP v3.4 section 5.3.2).
pub mod tags {
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written as the Length field on the wire.
    pub value: Bytes,
}

impl Tlv {
    /// Tag + Length header size
    pub const HEADER_SIZE: usize = 4;

    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn encoded_size(&self) -> usize {
        Self::HEADER_SIZE + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| CodecError::FieldValidation {
            field: "tlv",
            reason: format!(
                "value of tag {:#06x} is {} octets, limit is {}",
                self.tag,
                self.value.len(),
                u16::MAX
            ),
        })?;

        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    /// Decode one TLV. The cursor is bounded to the PDU, so a length that runs
    /// past it is an overflow rather than an incomplete read.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::HEADER_SIZE {
            return Err(CodecError::TruncatedTlv {
                remaining: buf.remaining(),
            });
        }

        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvLengthOverflow {
                tag,
                length,
                remaining: buf.remaining(),
            });
        }

        Ok(Tlv {
            tag,
            value: buf.copy_to_bytes(length),
        })
    }
}

/// Ordered mapping from optional parameter tag to raw value.
///
/// Insertion order is the wire order. Inserting a tag that is already present
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlvMap {
    entries: Vec<Tlv>,
}

impl TlvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: u16, value: impl Into<Bytes>) {
        let value = value.into();
        match self.entries.iter_mut().find(|tlv| tlv.tag == tag) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Tlv { tag, value }),
        }
    }

    pub fn get(&self, tag: u16) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|tlv| tlv.tag == tag)
            .map(|tlv| &tlv.value)
    }

    pub fn remove(&mut self, tag: u16) -> Option<Bytes> {
        let index = self.entries.iter().position(|tlv| tlv.tag == tag)?;
        Some(self.entries.remove(index).value)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tlv> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encoded_size(&self) -> usize {
        self.entries.iter().map(Tlv::encoded_size).sum()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        for tlv in &self.entries {
            tlv.encode(buf)?;
        }
        Ok(())
    }

    /// Decode TLVs until the end of the PDU body.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut map = TlvMap::new();
        while buf.has_remaining() {
            let tlv = Tlv::decode(buf)?;
            map.insert(tlv.tag, tlv.value);
        }
        Ok(map)
    }

    fn get_u8(&self, tag: u16) -> Option<u8> {
        match self.get(tag)?.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }

    fn get_u16(&self, tag: u16) -> Option<u16> {
        match self.get(tag)?.as_ref() {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    pub fn set_u8(&mut self, tag: u16, value: u8) {
        self.insert(tag, Bytes::copy_from_slice(&[value]));
    }

    pub fn set_u16(&mut self, tag: u16, value: u16) {
        self.insert(tag, Bytes::copy_from_slice(&value.to_be_bytes()));
    }

    /// message_payload (0x0424): extended short message user data
    pub fn message_payload(&self) -> Option<&Bytes> {
        self.get(tags::MESSAGE_PAYLOAD)
    }

    /// user_message_reference (0x0204)
    pub fn user_message_reference(&self) -> Option<u16> {
        self.get_u16(tags::USER_MESSAGE_REFERENCE)
    }

    /// source_port (0x020A)
    pub fn source_port(&self) -> Option<u16> {
        self.get_u16(tags::SOURCE_PORT)
    }

    /// destination_port (0x020B)
    pub fn destination_port(&self) -> Option<u16> {
        self.get_u16(tags::DESTINATION_PORT)
    }

    /// sar_msg_ref_num (0x020C)
    pub fn sar_msg_ref_num(&self) -> Option<u16> {
        self.get_u16(tags::SAR_MSG_REF_NUM)
    }

    /// sar_total_segments (0x020E)
    pub fn sar_total_segments(&self) -> Option<u8> {
        self.get_u8(tags::SAR_TOTAL_SEGMENTS)
    }

    /// sar_segment_seqnum (0x020F)
    pub fn sar_segment_seqnum(&self) -> Option<u8> {
        self.get_u8(tags::SAR_SEGMENT_SEQNUM)
    }

    /// sc_interface_version (0x0210), carried in bind responses
    pub fn sc_interface_version(&self) -> Option<u8> {
        self.get_u8(tags::SC_INTERFACE_VERSION)
    }

    /// receipted_message_id (0x001E), a C-Octet string on the wire
    pub fn receipted_message_id(&self) -> Option<&str> {
        let raw = self.get(tags::RECEIPTED_MESSAGE_ID)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end]).ok()
    }
}

impl<'a> IntoIterator for &'a TlvMap {
    type Item = &'a Tlv;
    type IntoIter = std::slice::Iter<'a, Tlv>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
