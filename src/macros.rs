// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Covers header-only PDUs (enquire_link, unbind, generic_nack) and builder setters

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// Generates Encodable/Decodable implementations for a struct with
/// `command_status` and `sequence_number` fields. Decoding rejects a frame
/// for another command and any trailing body octets.
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                if header.command_id != $command_id {
                    return Err($crate::codec::CodecError::UnexpectedCommandId {
                        expected: stringify!($pdu_type),
                        actual: header.command_id,
                    });
                }

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "body",
                        reason: format!(
                            concat!(stringify!($pdu_type), " carries {} unexpected body octets"),
                            buf.remaining()
                        ),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn command_id(&self) -> $crate::datatypes::CommandId {
                $command_id
            }

            fn command_status(&self) -> $crate::datatypes::CommandStatus {
                self.command_status
            }

            fn sequence_number(&self) -> u32 {
                self.sequence_number
            }

            fn encode_body(
                &self,
                _buf: &mut bytes::BytesMut,
            ) -> Result<(), $crate::codec::CodecError> {
                Ok(())
            }
        }
    };
}

/// Macro for generating builder setter methods
///
/// Each generated `with_<field>` method takes a value, sets the field and
/// returns self for chaining.
macro_rules! builder_setters {
    ($($setter:ident => $field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $setter(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

/// Macro for generating constructor methods for header-only PDUs
///
/// - `new(sequence_number: u32)` - Creates PDU with Ok status
/// - `error(sequence_number: u32, status: CommandStatus)` - Creates PDU with error status
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Codec implementation plus constructors for a header-only PDU
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

// Make macros available to the rest of the crate
pub(crate) use {
    builder_setters, impl_complete_header_only_pdu, impl_header_only_constructors,
    impl_header_only_pdu,
};
