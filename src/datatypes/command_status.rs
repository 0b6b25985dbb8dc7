use num_enum::TryFromPrimitive;

/// The command_status field of an SMPP response indicates the success or
/// failure of the request it answers. Requests carry `Ok` (NULL).
///
/// Values follow the SMPP v3.4 error code table (section 5.1.3).
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// ESME_ROK: No Error
    Ok = 0x00000000,

    /// ESME_RINVMSGLEN: Message Length is invalid
    InvalidMsgLength = 0x00000001,

    /// ESME_RINVCMDLEN: Command Length is invalid
    InvalidCommandLength = 0x00000002,

    /// ESME_RINVCMDID: Invalid Command ID
    InvalidCommandId = 0x00000003,

    /// ESME_RINVBNDSTS: Incorrect BIND Status for given command
    InvalidBindStatus = 0x00000004,

    /// ESME_RALYBND: ESME Already in Bound State
    AlreadyBound = 0x00000005,

    /// ESME_RINVPRTFLG: Invalid Priority Flag
    InvalidPriorityFlag = 0x00000006,

    /// ESME_RINVREGDLVFLG: Invalid Registered Delivery Flag
    InvalidRegisteredDeliveryFlag = 0x00000007,

    /// ESME_RSYSERR: System Error
    SystemError = 0x00000008,

    /// ESME_RINVSRCADR: Invalid Source Address
    InvalidSourceAddress = 0x0000000A,

    /// ESME_RINVDSTADR: Invalid Dest Addr
    InvalidDestinationAddress = 0x0000000B,

    /// ESME_RINVMSGID: Message ID is invalid
    InvalidMessageId = 0x0000000C,

    /// ESME_RBINDFAIL: Bind Failed
    BindFailed = 0x0000000D,

    /// ESME_RINVPASWD: Invalid Password
    InvalidPassword = 0x0000000E,

    /// ESME_RINVSYSID: Invalid System ID
    InvalidSystemId = 0x0000000F,

    /// ESME_RMSGQFUL: Message Queue Full
    MessageQueueFull = 0x00000014,

    /// ESME_RINVSERTYP: Invalid Service Type
    InvalidServiceType = 0x00000015,

    /// ESME_RINVESMCLASS: Invalid esm_class field data
    InvalidEsmClass = 0x00000043,

    /// ESME_RSUBMITFAIL: submit_sm or submit_multi failed
    SubmitFailed = 0x00000045,

    /// ESME_RINVSRCTON: Invalid Source address TON
    InvalidSourceAddressTon = 0x00000048,

    /// ESME_RINVSRCNPI: Invalid Source address NPI
    InvalidSourceAddressNpi = 0x00000049,

    /// ESME_RINVDSTTON: Invalid Destination address TON
    InvalidDestinationAddressTon = 0x00000050,

    /// ESME_RINVDSTNPI: Invalid Destination address NPI
    InvalidDestinationAddressNpi = 0x00000051,

    /// ESME_RINVSYSTYP: Invalid system_type field
    InvalidSystemType = 0x00000053,

    /// ESME_RTHROTTLED: ESME has exceeded allowed message limits
    Throttled = 0x00000058,

    /// ESME_RINVSCHED: Invalid Scheduled Delivery Time
    InvalidScheduledDeliveryTime = 0x00000061,

    /// ESME_RINVEXPIRY: Invalid message validity period
    InvalidExpiryTime = 0x00000062,

    /// ESME_RINVOPTPARSTREAM: Error in the optional part of the PDU Body
    InvalidOptionalParameterStream = 0x000000C0,

    /// ESME_ROPTPARNOTALLWD: Optional Parameter not allowed
    OptionalParameterNotAllowed = 0x000000C1,

    /// ESME_RINVPARLEN: Invalid Parameter Length
    InvalidParameterLength = 0x000000C2,

    /// ESME_RMISSINGOPTPARAM: Expected Optional Parameter missing
    MissingOptionalParameter = 0x000000C3,

    /// ESME_RINVOPTPARAMVAL: Invalid Optional Parameter Value
    InvalidOptionalParameterValue = 0x000000C4,

    /// ESME_RDELIVERYFAILURE: Delivery Failure
    DeliveryFailed = 0x000000FE,

    /// ESME_RUNKNOWNERR: Unknown Error
    UnknownError = 0x000000FF,
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        *self == CommandStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_match_the_error_table() {
        assert_eq!(CommandStatus::InvalidCommandLength as u32, 0x02);
        assert_eq!(CommandStatus::InvalidCommandId as u32, 0x03);
        assert_eq!(CommandStatus::InvalidBindStatus as u32, 0x04);
        assert_eq!(CommandStatus::SystemError as u32, 0x08);
        assert_eq!(CommandStatus::BindFailed as u32, 0x0D);
    }

    #[test]
    fn reserved_values_do_not_convert() {
        assert!(CommandStatus::try_from(0x0000_0009).is_err());
        assert_eq!(
            CommandStatus::try_from(0x0000_0058).unwrap(),
            CommandStatus::Throttled
        );
    }
}
