use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// An optional parameter carried after the mandatory fields of a PDU body
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// The encoded Length field is derived from it.
    pub value: Bytes,
}

impl Tlv {
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MESSAGE_STATE: u16 = 0x0427;

    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::TlvError(format!(
                "truncated TLV header, {} octets left",
                buf.remaining()
            )));
        }

        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "TLV {tag:#06x} declares {length} octets but only {} remain",
                buf.remaining()
            )));
        }

        Ok(Self {
            tag,
            value: buf.copy_to_bytes(length),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| {
            CodecError::TlvError(format!(
                "TLV {:#06x} value of {} octets does not fit a u16 length",
                self.tag,
                self.value.len()
            ))
        })?;

        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlv_wire_format() {
        let tlv = Tlv::new(Tlv::SC_INTERFACE_VERSION, vec![0x34]);
        let mut buf = BytesMut::new();
        tlv.encode(&mut buf).unwrap();

        assert_eq!(buf.as_ref(), &[0x02, 0x10, 0x00, 0x01, 0x34]);
        assert_eq!(tlv.encoded_size(), 5);
    }

    #[test]
    fn tlv_truncated_value() {
        let data: &[u8] = &[0x04, 0x24, 0x00, 0x05, 0x01, 0x02];
        let result = Tlv::decode(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::TlvError(_))));
    }
}
