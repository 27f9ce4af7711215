use crate::datatypes::CommandId;

bind_pdu!(
    /// Binds the ESME as a receiver of messages from the SMSC
    BindReceiver / BindReceiverResponse,
    CommandId::BindReceiver,
    CommandId::BindReceiverResp
);

bind_pdu!(
    /// Binds the ESME as a transmitter of messages to the SMSC
    BindTransmitter / BindTransmitterResponse,
    CommandId::BindTransmitter,
    CommandId::BindTransmitterResp
);

bind_pdu!(
    /// Binds the ESME as both transmitter and receiver over one connection
    BindTransceiver / BindTransceiverResponse,
    CommandId::BindTransceiver,
    CommandId::BindTransceiverResp
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};
    use crate::datatypes::{CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber};

    #[test]
    fn bind_transmitter_wire_format() {
        let pdu = BindTransmitter {
            command_status: CommandStatus::Ok,
            sequence_number: 1,
            system_id: "SMPP3TEST".to_string(),
            password: "secret08".to_string(),
            system_type: "SUBMIT1".to_string(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::International,
            addr_npi: NumericPlanIndicator::Isdn,
            address_range: String::new(),
        };

        let bytes = pdu.to_bytes().unwrap();

        let mut expected = vec![
            0x00, 0x00, 0x00, 0x2F, // command_length (47)
            0x00, 0x00, 0x00, 0x02, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        expected.extend_from_slice(b"SMPP3TEST\0");
        expected.extend_from_slice(b"secret08\0");
        expected.extend_from_slice(b"SUBMIT1\0");
        expected.extend_from_slice(&[0x34, 0x01, 0x01, 0x00]);

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn bind_rejects_long_password() {
        let pdu = BindReceiver {
            command_status: CommandStatus::Ok,
            sequence_number: 1,
            system_id: "id".to_string(),
            password: "too-long-password".to_string(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        };
        assert!(pdu.to_bytes().is_err());
    }

    #[test]
    fn rejected_bind_response_has_empty_body() {
        let resp = BindTransceiverResponse::error(4, CommandStatus::InvalidPassword);
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);

        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.command_status(), CommandStatus::InvalidPassword);
        assert_eq!(decoded, Frame::BindTransceiverResp(resp));
    }

    #[test]
    fn bind_response_carries_system_id() {
        let resp = BindTransmitterResponse::new(2, "SMSC");
        let decoded = Frame::decode(&resp.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, Frame::BindTransmitterResp(resp));
    }
}
