use crate::datatypes::CommandId;

short_message_pdu!(
    /// Issued by the SMSC to route a short message, or a delivery receipt, to the ESME
    DeliverSm,
    CommandId::DeliverSm
);

message_id_response!(
    /// The message_id of a deliver_sm_resp is unused and must be NULL
    DeliverSmResponse,
    CommandId::DeliverSmResp
);

impl DeliverSm {
    /// esm_class bits 2..5 set to 0b0001 mark an SMSC delivery receipt
    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & 0x3C == 0x04
    }
}
