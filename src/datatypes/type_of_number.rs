use crate::codec::{CodecError, decode_u8};
use num_enum::TryFromPrimitive;
use std::io::Cursor;

/// Type of Number (TON) of an SME address
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0x00,
    International = 0x01,
    National = 0x02,
    NetworkSpecific = 0x03,
    SubscriberNumber = 0x04,
    Alphanumeric = 0x05,
    Abbreviated = 0x06,
}

// Spelled out by hand: num_enum treats a `#[default]` variant as a catch-all
impl Default for TypeOfNumber {
    fn default() -> Self {
        TypeOfNumber::Unknown
    }
}

impl TypeOfNumber {
    pub(crate) fn decode(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, CodecError> {
        let raw = decode_u8(buf)?;
        Self::try_from(raw).map_err(|_| CodecError::FieldValidation {
            field,
            reason: format!("invalid type of number {raw:#04x}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(TypeOfNumber::National as u8, 2);
        assert_eq!(TypeOfNumber::Abbreviated as u8, 6);
        assert_eq!(TypeOfNumber::try_from(5).ok(), Some(TypeOfNumber::Alphanumeric));
        assert!(TypeOfNumber::try_from(7).is_err());
    }
}
