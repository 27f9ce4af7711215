use crate::datatypes::{CommandId, CommandStatus};

/// GenericNack is used to acknowledge the receipt of a PDU when the receiving
/// entity cannot process the PDU due to errors such as invalid command_id,
/// invalid command_status, or other format errors.
///
/// The generic_nack PDU has no message body and only contains the standard
/// SMPP header.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    /// The command_status field indicates the reason for the generic_nack
    pub command_status: CommandStatus,
    /// The sequence_number from the original PDU that caused the error.
    /// If the original sequence_number cannot be determined, this should be 0.
    pub sequence_number: u32,
}

impl GenericNack {
    /// Creates a new GenericNack with the specified command status and sequence number
    pub fn new(command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }

    /// Creates a GenericNack for an invalid command ID error
    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandId, sequence_number)
    }

    /// Creates a GenericNack for a system error
    pub fn system_error(sequence_number: u32) -> Self {
        Self::new(CommandStatus::SystemError, sequence_number)
    }
}

header_only_codec!(GenericNack, CommandId::GenericNack);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};

    #[test]
    fn generic_nack_wire_format() {
        let bytes = GenericNack::system_error(0x1234).to_bytes().unwrap();
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x00, // command_id
            0x00, 0x00, 0x00, 0x08, // command_status (SystemError)
            0x00, 0x00, 0x12, 0x34, // sequence_number
        ];
        assert_eq!(bytes.as_ref(), expected);
    }

    #[test]
    fn generic_nack_without_sequence_decodes() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x00, // command_id
            0x00, 0x00, 0x00, 0x03, // command_status (InvalidCommandId)
            0x00, 0x00, 0x00, 0x00, // sequence_number unknown
        ];
        let frame = Frame::decode(data).unwrap();
        assert_eq!(
            frame,
            Frame::GenericNack(GenericNack::invalid_command_id(0))
        );
    }
}
