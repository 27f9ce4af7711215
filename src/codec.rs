// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// Each PDU implements Encodable/Decodable; `Frame` is the tagged union the
// session layer moves around, and `PduRegistry` maps command ids to decoders.

use crate::datatypes::{
    BindReceiver, BindReceiverResponse, BindTransceiver, BindTransceiverResponse,
    BindTransmitter, BindTransmitterResponse, CommandId, CommandStatus, DeliverSm,
    DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm,
    SubmitSmResponse, Tlv, Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
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

    /// Header for an outbound PDU; `command_length` is patched once the body is encoded.
    pub fn new(command_id: CommandId, command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_length: 0,
            command_id,
            command_status,
            sequence_number,
        }
    }

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status_raw = buf.get_u32();
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;

        // Vendor specific and reserved codes decode as `CommandStatus::Other`
        let command_status = CommandStatus::from_wire(command_status_raw);

        // Validate SMPP v3.4 rule: requests must have command_status = 0
        if !command_id.is_response() && command_status != CommandStatus::Ok {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // generic_nack may carry 0 when the offending PDU had no readable sequence
        if (sequence_number == 0 && command_id != CommandId::GenericNack)
            || sequence_number == 0xFFFF_FFFF
        {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

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
        buf.put_u32(self.command_status.code());
        buf.put_u32(self.sequence_number);
    }
}

/// Trait for PDUs that can be encoded to bytes
pub trait Encodable {
    /// Header of this PDU (the length is computed by `to_bytes`)
    fn header(&self) -> PduHeader;

    /// Encode the body that follows the 16 byte header
    fn encode_body(&self, _buf: &mut BytesMut) -> Result<(), CodecError> {
        Ok(())
    }

    /// Encode header and body, fixing up command_length
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.header().encode(&mut buf);
        self.encode_body(&mut buf)?;

        let length = buf.len() as u32;
        if length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status:?}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0} (0 and 0xFFFFFFFF are reserved)")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl CodecError {
    /// Convert codec errors to appropriate SMPP command_status codes
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            CodecError::TlvError(_) => CommandStatus::ErrorInOptionalPartofPduBody,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a NUL terminated C-Octet String of at most `max_len` characters
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let window = &chunk[..chunk.len().min(max_len + 1)];

    let Some(end) = window.iter().position(|&b| b == 0) else {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("missing NUL terminator within {} octets", max_len + 1),
        });
    };

    let value = String::from_utf8(window[..end].to_vec())
        .map_err(|source| CodecError::Utf8Error { field, source })?;
    buf.advance(end + 1);

    Ok(value)
}

/// Encode a C-Octet String, rejecting values longer than `max_len`
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    if value.len() > max_len {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("{} octets exceeds maximum of {max_len}", value.len()),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field,
            reason: "embedded NUL octet".to_string(),
        });
    }

    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode the trailing optional parameters of a PDU body
pub fn decode_tlvs(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
    let mut tlvs = Vec::new();
    while buf.has_remaining() {
        tlvs.push(Tlv::decode(buf)?);
    }
    Ok(tlvs)
}

/// Encode optional parameters in order
pub fn encode_tlvs(buf: &mut BytesMut, tlvs: &[Tlv]) -> Result<(), CodecError> {
    tlvs.iter().try_for_each(|tlv| tlv.encode(buf))
}

/// Generic frame type that can hold any PDU
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Session management PDUs
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    BindReceiver(BindReceiver),
    BindReceiverResp(BindReceiverResponse),
    BindTransmitter(BindTransmitter),
    BindTransmitterResp(BindTransmitterResponse),
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    GenericNack(GenericNack),

    // Recognised command ids this crate does not model (query_sm, data_sm, ...)
    Unknown { header: PduHeader, body: Bytes },
}

/// Dispatch an expression over every typed PDU variant
macro_rules! each_pdu {
    ($frame:expr, $pdu:ident => $body:expr, $header:ident => $unknown:expr) => {
        match $frame {
            Frame::EnquireLink($pdu) => $body,
            Frame::EnquireLinkResp($pdu) => $body,
            Frame::Unbind($pdu) => $body,
            Frame::UnbindResp($pdu) => $body,
            Frame::BindReceiver($pdu) => $body,
            Frame::BindReceiverResp($pdu) => $body,
            Frame::BindTransmitter($pdu) => $body,
            Frame::BindTransmitterResp($pdu) => $body,
            Frame::BindTransceiver($pdu) => $body,
            Frame::BindTransceiverResp($pdu) => $body,
            Frame::SubmitSm($pdu) => $body,
            Frame::SubmitSmResp($pdu) => $body,
            Frame::DeliverSm($pdu) => $body,
            Frame::DeliverSmResp($pdu) => $body,
            Frame::GenericNack($pdu) => $body,
            Frame::Unknown { header: $header, .. } => $unknown,
        }
    };
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        each_pdu!(self, pdu => pdu.header().command_id, header => header.command_id)
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        each_pdu!(self, pdu => pdu.sequence_number, header => header.sequence_number)
    }

    /// Overwrite the sequence number, used when a request is handed to a session
    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        each_pdu!(
            self,
            pdu => pdu.sequence_number = sequence_number,
            header => header.sequence_number = sequence_number
        )
    }

    /// command_status of the frame; always `Ok` for requests
    pub fn command_status(&self) -> CommandStatus {
        each_pdu!(self, pdu => pdu.command_status, header => header.command_status)
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Check if this frame is a request PDU
    pub fn is_request(&self) -> bool {
        !self.is_response()
    }

    /// Serialize this frame to its wire representation
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Frame::Unknown { header, body } => {
                let mut buf = BytesMut::with_capacity(PduHeader::SIZE + body.len());
                PduHeader {
                    command_length: (PduHeader::SIZE + body.len()) as u32,
                    ..header.clone()
                }
                .encode(&mut buf);
                buf.put_slice(body);
                Ok(buf.freeze())
            }
            other => each_pdu!(other, pdu => pdu.to_bytes(), _header => unreachable!()),
        }
    }

    /// Decode one complete PDU (header and body) using a throwaway registry
    pub fn decode(bytes: &[u8]) -> Result<Frame, CodecError> {
        PduRegistry::new().decode_frame(bytes)
    }

    /// Build the successful response matching this request.
    ///
    /// Returns `None` for responses and for request kinds whose response
    /// carries mandatory data the caller has to supply (binds, submit_sm).
    pub fn create_response(&self) -> Option<Frame> {
        let sequence_number = self.sequence_number();
        match self {
            Frame::EnquireLink(_) => Some(Frame::EnquireLinkResp(EnquireLinkResponse::new(
                sequence_number,
            ))),
            Frame::Unbind(_) => Some(Frame::UnbindResp(UnbindResponse::new(sequence_number))),
            Frame::DeliverSm(_) => Some(Frame::DeliverSmResp(DeliverSmResponse::new(
                sequence_number,
            ))),
            _ => None,
        }
    }

    /// Build a generic_nack answering this frame with the given status
    pub fn create_nack(&self, command_status: CommandStatus) -> Frame {
        Frame::GenericNack(GenericNack::new(command_status, self.sequence_number()))
    }

    /// Short PDU name for log lines
    pub fn name(&self) -> String {
        format!("{:?}", self.command_id())
    }
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

impl PduRegistry {
    /// Create a new registry with the PDUs this crate models
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu(Frame::EnquireLink);
        registry.register_pdu(Frame::EnquireLinkResp);
        registry.register_pdu(Frame::Unbind);
        registry.register_pdu(Frame::UnbindResp);
        registry.register_pdu(Frame::GenericNack);

        registry.register_pdu(Frame::BindReceiver);
        registry.register_pdu(Frame::BindReceiverResp);
        registry.register_pdu(Frame::BindTransmitter);
        registry.register_pdu(Frame::BindTransmitterResp);
        registry.register_pdu(Frame::BindTransceiver);
        registry.register_pdu(Frame::BindTransceiverResp);

        // Message PDUs are boxed, they are considerably larger than the rest
        registry.register_pdu(|pdu: SubmitSm| Frame::SubmitSm(Box::new(pdu)));
        registry.register_pdu(Frame::SubmitSmResp);
        registry.register_pdu(|pdu: DeliverSm| Frame::DeliverSm(Box::new(pdu)));
        registry.register_pdu(Frame::DeliverSmResp);

        registry
    }

    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(T::command_id(), decoder);
    }

    /// Decode a PDU given its header and a cursor positioned at its body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => {
                let body = buf.copy_to_bytes(buf.remaining());
                tracing::debug!(
                    "No decoder for command_id {:?}, keeping body as opaque data",
                    header.command_id
                );
                Ok(Frame::Unknown { header, body })
            }
        }
    }

    /// Decode exactly one PDU occupying the whole of `bytes`
    pub fn decode_frame(&self, bytes: &[u8]) -> Result<Frame, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let header = PduHeader::decode(&mut cursor)?;

        let length = header.command_length as usize;
        if length > bytes.len() {
            return Err(CodecError::Incomplete);
        }

        let mut body = Cursor::new(&bytes[..length]);
        body.set_position(PduHeader::SIZE as u64);
        self.decode_pdu(header, &mut body)
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl std::fmt::Debug for PduRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PduRegistry")
            .field("registered", &self.decoders.len())
            .finish()
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}
