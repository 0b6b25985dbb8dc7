use crate::datatypes::CommandId;
use crate::datatypes::CommandStatus;
use crate::macros::impl_complete_header_only_pdu;

/// Keep-alive probe. Either side may send it at any time once the TCP
/// connection is up; it never changes session state.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    // pub command_length: u32, (always 16)
    // pub command_id: CommandId::EnquireLink,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    // pub command_length: u32, (always 16)
    // pub command_id: CommandId::EnquireLinkResp,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);
