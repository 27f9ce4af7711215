// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Includes macros for header-only PDUs, binds, short message PDUs and builder setters

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
///
/// # Generated code
/// - Decodable implementation that rejects any trailing body octets
/// - Encodable implementation producing the bare 16 octet header
macro_rules! header_only_codec {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: concat!(stringify!($pdu_type), " PDU should have no body")
                            .to_string(),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn header(&self) -> $crate::codec::PduHeader {
                $crate::codec::PduHeader::new(
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                )
            }
        }
    };
}

/// Macro for declaring a complete header-only PDU
///
/// Declares the struct, the `new`/`error` constructors and the codec
/// implementations in one go.
macro_rules! header_only_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
        }

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

        header_only_codec!($pdu_type, $command_id);
    };
}

/// Macro for declaring one bind request/response pair
///
/// bind_receiver, bind_transmitter and bind_transceiver share an identical
/// body layout and differ only in their command ids.
macro_rules! bind_pdu {
    (
        $(#[$meta:meta])*
        $request:ident / $response:ident,
        $request_id:expr,
        $response_id:expr
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $request {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,

            pub system_id: String,
            pub password: String,
            pub system_type: String,
            pub interface_version: $crate::datatypes::InterfaceVersion,
            pub addr_ton: $crate::datatypes::TypeOfNumber,
            pub addr_npi: $crate::datatypes::NumericPlanIndicator,
            pub address_range: String,
        }

        #[derive(Clone, Debug, PartialEq)]
        pub struct $response {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,

            /// Identifies the SMSC to the ESME; may be absent on error responses
            pub system_id: String,
            pub optional_parameters: Vec<$crate::datatypes::Tlv>,
        }

        impl $crate::codec::Decodable for $request {
            fn command_id() -> $crate::datatypes::CommandId {
                $request_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_u8};
                use $crate::datatypes::limits;

                Self::validate_header(&header)?;

                let system_id = decode_cstring(buf, limits::SYSTEM_ID, "system_id")?;
                let password = decode_cstring(buf, limits::PASSWORD, "password")?;
                let system_type = decode_cstring(buf, limits::SYSTEM_TYPE, "system_type")?;

                let raw_version = decode_u8(buf)?;
                let interface_version = $crate::datatypes::InterfaceVersion::try_from(raw_version)
                    .map_err(|_| $crate::codec::CodecError::FieldValidation {
                        field: "interface_version",
                        reason: format!("unsupported interface version {raw_version:#04x}"),
                    })?;

                let addr_ton = $crate::datatypes::TypeOfNumber::decode(buf, "addr_ton")?;
                let addr_npi = $crate::datatypes::NumericPlanIndicator::decode(buf, "addr_npi")?;
                let address_range = decode_cstring(buf, limits::ADDRESS_RANGE, "address_range")?;

                Ok(Self {
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

        impl $crate::codec::Encodable for $request {
            fn header(&self) -> $crate::codec::PduHeader {
                $crate::codec::PduHeader::new($request_id, self.command_status, self.sequence_number)
            }

            fn encode_body(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;
                use $crate::datatypes::limits;

                encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")?;
                encode_cstring(buf, &self.password, limits::PASSWORD, "password")?;
                encode_cstring(buf, &self.system_type, limits::SYSTEM_TYPE, "system_type")?;
                buf.put_u8(self.interface_version as u8);
                buf.put_u8(self.addr_ton as u8);
                buf.put_u8(self.addr_npi as u8);
                encode_cstring(buf, &self.address_range, limits::ADDRESS_RANGE, "address_range")
            }
        }

        impl $response {
            /// Successful response carrying the SMSC's system_id
            pub fn new(sequence_number: u32, system_id: &str) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    system_id: system_id.to_string(),
                    optional_parameters: Vec::new(),
                }
            }

            /// Rejection with an empty body
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    system_id: String::new(),
                    optional_parameters: Vec::new(),
                }
            }
        }

        impl $crate::codec::Decodable for $response {
            fn command_id() -> $crate::datatypes::CommandId {
                $response_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;
                use $crate::codec::{decode_cstring, decode_tlvs};
                use $crate::datatypes::limits;

                Self::validate_header(&header)?;

                // SMSCs commonly omit the body entirely when rejecting a bind
                let system_id = if buf.has_remaining() {
                    decode_cstring(buf, limits::SYSTEM_ID, "system_id")?
                } else {
                    String::new()
                };
                let optional_parameters = decode_tlvs(buf)?;

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    system_id,
                    optional_parameters,
                })
            }
        }

        impl $crate::codec::Encodable for $response {
            fn header(&self) -> $crate::codec::PduHeader {
                $crate::codec::PduHeader::new($response_id, self.command_status, self.sequence_number)
            }

            fn encode_body(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::datatypes::limits;

                if self.command_status == $crate::datatypes::CommandStatus::Ok
                    || !self.system_id.is_empty()
                {
                    $crate::codec::encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")?;
                }
                $crate::codec::encode_tlvs(buf, &self.optional_parameters)
            }
        }
    };
}

/// Macro for declaring a short message PDU (submit_sm, deliver_sm)
///
/// Both PDUs carry the same mandatory parameters in the same order, followed
/// by optional TLVs. `sm_length` is derived from `short_message` on encode.
macro_rules! short_message_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,

            pub service_type: String,
            pub source_addr_ton: $crate::datatypes::TypeOfNumber,
            pub source_addr_npi: $crate::datatypes::NumericPlanIndicator,
            pub source_addr: String,
            pub dest_addr_ton: $crate::datatypes::TypeOfNumber,
            pub dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
            pub destination_addr: String,
            pub esm_class: u8,
            pub protocol_id: u8,
            pub priority_flag: u8,
            pub schedule_delivery_time: String,
            pub validity_period: String,
            pub registered_delivery: u8,
            pub replace_if_present_flag: u8,
            pub data_coding: u8,
            pub sm_default_msg_id: u8,
            /// Up to 254 octets of user data, already encoded per `data_coding`
            pub short_message: Vec<u8>,
            pub optional_parameters: Vec<$crate::datatypes::Tlv>,
        }

        impl $pdu_type {
            /// A PDU with every optional field left at its NULL default
            pub fn new(destination_addr: &str, short_message: Vec<u8>) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number: 1,
                    service_type: String::new(),
                    source_addr_ton: Default::default(),
                    source_addr_npi: Default::default(),
                    source_addr: String::new(),
                    dest_addr_ton: Default::default(),
                    dest_addr_npi: Default::default(),
                    destination_addr: destination_addr.to_string(),
                    esm_class: 0,
                    protocol_id: 0,
                    priority_flag: 0,
                    schedule_delivery_time: String::new(),
                    validity_period: String::new(),
                    registered_delivery: 0,
                    replace_if_present_flag: 0,
                    data_coding: 0,
                    sm_default_msg_id: 0,
                    short_message,
                    optional_parameters: Vec::new(),
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;
                use $crate::codec::{decode_cstring, decode_tlvs, decode_u8, CodecError};
                use $crate::datatypes::{limits, NumericPlanIndicator, TypeOfNumber};

                Self::validate_header(&header)?;

                let service_type = decode_cstring(buf, limits::SERVICE_TYPE, "service_type")?;
                let source_addr_ton = TypeOfNumber::decode(buf, "source_addr_ton")?;
                let source_addr_npi = NumericPlanIndicator::decode(buf, "source_addr_npi")?;
                let source_addr = decode_cstring(buf, limits::ADDRESS, "source_addr")?;
                let dest_addr_ton = TypeOfNumber::decode(buf, "dest_addr_ton")?;
                let dest_addr_npi = NumericPlanIndicator::decode(buf, "dest_addr_npi")?;
                let destination_addr = decode_cstring(buf, limits::ADDRESS, "destination_addr")?;
                let esm_class = decode_u8(buf)?;
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time =
                    decode_cstring(buf, limits::TIME, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, limits::TIME, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = decode_u8(buf)?;
                let sm_default_msg_id = decode_u8(buf)?;

                let sm_length = decode_u8(buf)? as usize;
                if buf.remaining() < sm_length {
                    return Err(CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "sm_length {sm_length} exceeds the {} octets left in the PDU",
                            buf.remaining()
                        ),
                    });
                }
                let short_message = buf.copy_to_bytes(sm_length).to_vec();
                let optional_parameters = decode_tlvs(buf)?;

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    optional_parameters,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn header(&self) -> $crate::codec::PduHeader {
                $crate::codec::PduHeader::new($command_id, self.command_status, self.sequence_number)
            }

            fn encode_body(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::{encode_cstring, encode_tlvs, CodecError};
                use $crate::datatypes::limits;

                if self.short_message.len() > limits::SHORT_MESSAGE {
                    return Err(CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds maximum of {}, use the message_payload TLV",
                            self.short_message.len(),
                            limits::SHORT_MESSAGE
                        ),
                    });
                }

                encode_cstring(buf, &self.service_type, limits::SERVICE_TYPE, "service_type")?;
                buf.put_u8(self.source_addr_ton as u8);
                buf.put_u8(self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr, limits::ADDRESS, "source_addr")?;
                buf.put_u8(self.dest_addr_ton as u8);
                buf.put_u8(self.dest_addr_npi as u8);
                encode_cstring(buf, &self.destination_addr, limits::ADDRESS, "destination_addr")?;
                buf.put_u8(self.esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(
                    buf,
                    &self.schedule_delivery_time,
                    limits::TIME,
                    "schedule_delivery_time",
                )?;
                encode_cstring(buf, &self.validity_period, limits::TIME, "validity_period")?;
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding);
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(self.short_message.len() as u8);
                buf.put_slice(&self.short_message);

                encode_tlvs(buf, &self.optional_parameters)
            }
        }
    };
}

/// Macro for declaring a response whose body is a single message_id
///
/// Error responses may omit the body, in which case message_id decodes empty.
macro_rules! message_id_response {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
            pub message_id: String,
        }

        impl $pdu_type {
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id: String::new(),
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    ..Self::new(sequence_number)
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                let message_id = if buf.has_remaining() {
                    $crate::codec::decode_cstring(
                        buf,
                        $crate::datatypes::limits::MESSAGE_ID,
                        "message_id",
                    )?
                } else {
                    String::new()
                };

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn header(&self) -> $crate::codec::PduHeader {
                $crate::codec::PduHeader::new($command_id, self.command_status, self.sequence_number)
            }

            fn encode_body(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::encode_cstring(
                    buf,
                    &self.message_id,
                    $crate::datatypes::limits::MESSAGE_ID,
                    "message_id",
                )
            }
        }
    };
}

/// Macro for generating fluent builder setters
///
/// # Generated code
/// For each `method => field: Type` entry:
/// ```ignore
/// pub fn method(mut self, field: Type) -> Self {
///     self.field = field;
///     self
/// }
/// ```
macro_rules! builder_setters {
    ($($(#[$meta:meta])* $method:ident => $field:ident: $type:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $method(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}
