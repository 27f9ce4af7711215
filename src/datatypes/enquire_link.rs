use crate::datatypes::CommandId;

header_only_pdu!(
    /// Keep-alive ping; either side may send it while bound
    EnquireLink,
    CommandId::EnquireLink
);

header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn enquire_link_rejects_body() {
        let header = PduHeader {
            command_length: 17,
            command_id: CommandId::EnquireLink,
            command_status: crate::datatypes::CommandStatus::Ok,
            sequence_number: 3,
        };
        let body: &[u8] = &[0x00];
        assert!(EnquireLink::decode(header, &mut Cursor::new(body)).is_err());
    }

    #[test]
    fn enquire_link_response_is_header_only() {
        let bytes = EnquireLinkResponse::new(3).to_bytes().unwrap();
        assert_eq!(bytes.len(), PduHeader::SIZE);
        assert_eq!(&bytes[4..8], &[0x80, 0x00, 0x00, 0x15]);
    }
}
