mod bind;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod submit_sm;
mod tlv;
mod type_of_number;
mod unbind;

pub use bind::{
    BindReceiver, BindReceiverResponse, BindTransceiver, BindTransceiverResponse,
    BindTransmitter, BindTransmitterResponse,
};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::Tlv;
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};

/// SMPP v3.4 field length limits, excluding the NUL terminator
pub mod limits {
    pub const SYSTEM_ID: usize = 15;
    pub const PASSWORD: usize = 8;
    pub const SYSTEM_TYPE: usize = 12;
    pub const ADDRESS_RANGE: usize = 40;
    pub const ADDRESS: usize = 20;
    pub const SERVICE_TYPE: usize = 5;
    pub const SHORT_MESSAGE: usize = 254;
    pub const MESSAGE_ID: usize = 64;
    pub const TIME: usize = 16;
}

/// data_coding value for UCS2 (ISO/IEC-10646) encoded short messages
pub const DATA_CODING_UCS2: u8 = 0x08;
