// ABOUTME: Supporting types for SMPP client operations including credentials and messages
// ABOUTME: Converts application level SmsMessage values into submit_sm PDUs

use super::config::SubmitConfig;
use super::error::{SmppError, SmppResult};
use crate::codec::Frame;
use crate::datatypes::{
    limits, BindReceiver, BindTransceiver, BindTransmitter, CommandId, CommandStatus,
    InterfaceVersion, NumericPlanIndicator, SubmitSm, TypeOfNumber, DATA_CODING_UCS2,
};
use std::fmt;
use std::str::FromStr;

/// The role a session binds in
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BindType {
    Receiver,
    Transmitter,
    #[default]
    Transceiver,
}

impl BindType {
    pub fn command_id(self) -> CommandId {
        match self {
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_id(self) -> CommandId {
        match self {
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    /// Build the bind request for this role; the sequence number is assigned on send
    #[allow(clippy::too_many_arguments)]
    pub fn bind_frame(
        self,
        system_id: &str,
        password: &str,
        system_type: &str,
        interface_version: InterfaceVersion,
        addr_ton: TypeOfNumber,
        addr_npi: NumericPlanIndicator,
        address_range: &str,
    ) -> Frame {
        macro_rules! bind {
            ($pdu:ident) => {
                Frame::$pdu($pdu {
                    command_status: CommandStatus::Ok,
                    sequence_number: 1,
                    system_id: system_id.to_string(),
                    password: password.to_string(),
                    system_type: system_type.to_string(),
                    interface_version,
                    addr_ton,
                    addr_npi,
                    address_range: address_range.to_string(),
                })
            };
        }

        match self {
            BindType::Receiver => bind!(BindReceiver),
            BindType::Transmitter => bind!(BindTransmitter),
            BindType::Transceiver => bind!(BindTransceiver),
        }
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindType::Receiver => "receiver",
            BindType::Transmitter => "transmitter",
            BindType::Transceiver => "transceiver",
        })
    }
}

impl FromStr for BindType {
    type Err = SmppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receiver" | "rcvr" => Ok(BindType::Receiver),
            "transmitter" | "xmit" => Ok(BindType::Transmitter),
            "transceiver" | "xcvr" => Ok(BindType::Transceiver),
            other => Err(SmppError::InvalidConfig(format!(
                "unknown bind type '{other}', expected receiver, transmitter or transceiver"
            ))),
        }
    }
}

/// SMPP bind operation credentials
///
/// Contains authentication information, the bind role and the ESME address
/// range announced to the SMSC.
#[derive(Debug, Clone, PartialEq)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication
    pub password: String,
    /// System type, empty when not applicable
    pub system_type: String,
    /// Type of bind operation to perform
    pub bind_type: BindType,
    /// SMPP interface version to announce
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

impl Default for BindCredentials {
    fn default() -> Self {
        Self {
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            bind_type: BindType::default(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }
}

impl BindCredentials {
    pub fn new(
        bind_type: BindType,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            bind_type,
            ..Default::default()
        }
    }

    pub fn transmitter(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Transmitter, system_id, password)
    }

    pub fn receiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Receiver, system_id, password)
    }

    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Transceiver, system_id, password)
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        range: impl Into<String>,
    ) -> Self {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = range.into();
        self
    }

    /// The bind request these credentials produce
    pub fn bind_frame(&self) -> Frame {
        self.bind_type.bind_frame(
            &self.system_id,
            &self.password,
            &self.system_type,
            self.interface_version,
            self.addr_ton,
            self.addr_npi,
            &self.address_range,
        )
    }

    pub(crate) fn validate(&self) -> SmppResult<()> {
        let check = |field: &str, value: &str, max: usize| {
            if value.len() > max {
                Err(SmppError::InvalidConfig(format!(
                    "{field} is {} octets long, the maximum is {max}",
                    value.len()
                )))
            } else {
                Ok(())
            }
        };

        check("system_id", &self.system_id, limits::SYSTEM_ID)?;
        check("password", &self.password, limits::PASSWORD)?;
        check("system_type", &self.system_type, limits::SYSTEM_TYPE)?;
        check("address_range", &self.address_range, limits::ADDRESS_RANGE)
    }
}

/// Payload of a short message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Text, sent UCS2 encoded
    Text(String),
    /// Octets already encoded per `data_coding`
    Encoded { data_coding: u8, data: Vec<u8> },
}

impl MessageBody {
    fn encode(&self) -> (u8, Vec<u8>) {
        match self {
            MessageBody::Text(text) => (
                DATA_CODING_UCS2,
                text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            ),
            MessageBody::Encoded { data_coding, data } => (*data_coding, data.clone()),
        }
    }
}

/// Optional submit_sm parameters, all defaulting to NULL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsOptions {
    pub service_type: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub sm_default_msg_id: u8,
}

impl SmsOptions {
    builder_setters! {
        with_service_type => service_type: String,
        with_esm_class => esm_class: u8,
        with_protocol_id => protocol_id: u8,
        with_priority_flag => priority_flag: u8,
        with_schedule_delivery_time => schedule_delivery_time: String,
        with_validity_period => validity_period: String,
        with_registered_delivery => registered_delivery: u8,
    }

    /// Request an SMSC delivery receipt
    pub fn with_delivery_receipt(self) -> Self {
        self.with_registered_delivery(0x01)
    }
}

/// Simplified SMS message for `Supervisor::submit`
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub destination_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub body: MessageBody,
    pub options: SmsOptions,
}

impl SmsMessage {
    /// A text message to `to`, sent UCS2 encoded
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            destination_addr: to.into(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            body: MessageBody::Text(text.into()),
            options: SmsOptions::default(),
        }
    }

    /// A message whose octets are already encoded per `data_coding`
    pub fn encoded(to: impl Into<String>, data_coding: u8, data: Vec<u8>) -> Self {
        Self {
            body: MessageBody::Encoded { data_coding, data },
            ..Self::new(to, "")
        }
    }

    pub fn with_destination_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.dest_addr_ton = ton;
        self.dest_addr_npi = npi;
        self
    }

    pub fn with_options(mut self, options: SmsOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the submit_sm PDU, source address taken from `submit`
    pub fn to_submit_sm(&self, submit: &SubmitConfig) -> SmppResult<SubmitSm> {
        if self.destination_addr.is_empty() {
            return Err(SmppError::InvalidData("destination address is empty".into()));
        }
        if self.destination_addr.len() > limits::ADDRESS {
            return Err(SmppError::InvalidData(format!(
                "destination address '{}' exceeds {} characters",
                self.destination_addr,
                limits::ADDRESS
            )));
        }

        let (data_coding, short_message) = self.body.encode();
        if short_message.len() > limits::SHORT_MESSAGE {
            return Err(SmppError::InvalidData(format!(
                "message is {} octets once encoded, the maximum is {}",
                short_message.len(),
                limits::SHORT_MESSAGE
            )));
        }

        let options = &self.options;
        let mut pdu = SubmitSm::new(&self.destination_addr, short_message);
        pdu.source_addr_ton = submit.source_addr_ton;
        pdu.source_addr_npi = submit.source_addr_npi;
        pdu.source_addr = submit.source_addr.clone();
        pdu.dest_addr_ton = self.dest_addr_ton;
        pdu.dest_addr_npi = self.dest_addr_npi;
        pdu.data_coding = data_coding;
        pdu.service_type = options.service_type.clone();
        pdu.esm_class = options.esm_class;
        pdu.protocol_id = options.protocol_id;
        pdu.priority_flag = options.priority_flag;
        pdu.schedule_delivery_time = options.schedule_delivery_time.clone();
        pdu.validity_period = options.validity_period.clone();
        pdu.registered_delivery = options.registered_delivery;
        pdu.replace_if_present_flag = options.replace_if_present_flag;
        pdu.sm_default_msg_id = options.sm_default_msg_id;

        Ok(pdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_type_parsing() {
        assert_eq!("xcvr".parse::<BindType>().unwrap(), BindType::Transceiver);
        assert_eq!("Receiver".parse::<BindType>().unwrap(), BindType::Receiver);
        assert_eq!("xmit".parse::<BindType>().unwrap(), BindType::Transmitter);
        assert!(matches!(
            "outbind".parse::<BindType>(),
            Err(SmppError::InvalidConfig(_))
        ));
        assert_eq!(BindType::default(), BindType::Transceiver);
        assert_eq!(BindType::Receiver.to_string(), "receiver");
    }

    #[test]
    fn credentials_build_matching_bind() {
        let credentials = BindCredentials::receiver("esme", "pw").with_system_type("VMA");
        let frame = credentials.bind_frame();

        assert_eq!(frame.command_id(), CommandId::BindReceiver);
        match frame {
            Frame::BindReceiver(pdu) => {
                assert_eq!(pdu.system_id, "esme");
                assert_eq!(pdu.system_type, "VMA");
                assert_eq!(pdu.interface_version, InterfaceVersion::SmppV34);
            }
            other => panic!("Expected BindReceiver, got {other:?}"),
        }
    }

    #[test]
    fn credentials_validate_field_limits() {
        assert!(BindCredentials::transceiver("esme", "secret").validate().is_ok());
        assert!(BindCredentials::transceiver("esme", "123456789").validate().is_err());
        assert!(BindCredentials::transceiver("a-very-long-system-id", "pw")
            .validate()
            .is_err());
    }

    #[test]
    fn text_messages_are_ucs2() {
        let submit = SubmitConfig::default()
            .with_source(TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown, "ACME");
        let pdu = SmsMessage::new("79876543210", "Hi ж")
            .with_destination_numbering(TypeOfNumber::International, NumericPlanIndicator::Isdn)
            .to_submit_sm(&submit)
            .unwrap();

        assert_eq!(pdu.data_coding, DATA_CODING_UCS2);
        assert_eq!(pdu.short_message, vec![0x00, b'H', 0x00, b'i', 0x00, b' ', 0x04, 0x36]);
        assert_eq!(pdu.source_addr, "ACME");
        assert_eq!(pdu.source_addr_ton, TypeOfNumber::Alphanumeric);
        assert_eq!(pdu.dest_addr_ton, TypeOfNumber::International);
        assert_eq!(pdu.registered_delivery, 0);
    }

    #[test]
    fn encoded_messages_keep_data_coding() {
        let message = SmsMessage::encoded("123", 0x03, b"caf\xe9".to_vec())
            .with_options(SmsOptions::default().with_delivery_receipt());
        let pdu = message.to_submit_sm(&SubmitConfig::default()).unwrap();

        assert_eq!(pdu.data_coding, 0x03);
        assert_eq!(pdu.short_message, b"caf\xe9".to_vec());
        assert_eq!(pdu.registered_delivery, 0x01);
    }

    #[test]
    fn oversized_messages_are_rejected() {
        // 128 UCS2 characters encode to 256 octets
        let message = SmsMessage::new("123", "x".repeat(128));
        assert!(matches!(
            message.to_submit_sm(&SubmitConfig::default()),
            Err(SmppError::InvalidData(_))
        ));
        assert!(SmsMessage::new("", "hi")
            .to_submit_sm(&SubmitConfig::default())
            .is_err());
    }
}
