mod bind;
mod command_id;
mod command_status;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod priority_flag;
mod submit_sm;
mod tlv;
mod type_of_number;
mod unbind;

pub use bind::{
    Bind, BindResponse, BindType, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_SYSTEM_ID_LENGTH, MAX_SYSTEM_TYPE_LENGTH,
};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use priority_flag::PriorityFlag;
pub use submit_sm::{
    MAX_ADDRESS_LENGTH, MAX_MESSAGE_ID_LENGTH, MAX_SHORT_MESSAGE_LENGTH, SubmitSm,
    SubmitSmResponse,
};
pub use tlv::{Tlv, TlvMap, tags};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};
