/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Conversion from the wire byte never fails: values up to 0x33 denote v3.3 or
/// earlier, 0x34..0x4F denote v3.4 and anything from 0x50 up denotes v5.0.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    #[default]
    SmppV34 = 0x34,
    SmppV50 = 0x50,
}

impl From<u8> for InterfaceVersion {
    fn from(value: u8) -> Self {
        match value {
            0x00..=0x33 => InterfaceVersion::SmppV33,
            0x34..=0x4F => InterfaceVersion::SmppV34,
            _ => InterfaceVersion::SmppV50,
        }
    }
}
