use crate::codec::{CodecError, decode_u8};
use num_enum::TryFromPrimitive;
use std::io::Cursor;

/// Numbering Plan Indicator (NPI) of an SME address
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumericPlanIndicator {
    Unknown = 0x00,
    Isdn = 0x01,
    Data = 0x03,
    Telex = 0x04,
    LandMobile = 0x06,
    National = 0x08,
    Private = 0x09,
    Ermes = 0x0A,
    Internet = 0x0E,
    WapClientId = 0x12,
}

impl Default for NumericPlanIndicator {
    fn default() -> Self {
        NumericPlanIndicator::Unknown
    }
}

impl NumericPlanIndicator {
    pub(crate) fn decode(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, CodecError> {
        let raw = decode_u8(buf)?;
        Self::try_from(raw).map_err(|_| CodecError::FieldValidation {
            field,
            reason: format!("invalid numbering plan indicator {raw:#04x}"),
        })
    }
}
