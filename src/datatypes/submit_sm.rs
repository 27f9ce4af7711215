use crate::datatypes::CommandId;

short_message_pdu!(
    /// This operation is used by an ESME to submit a short message to the SMSC for onward
    /// transmission to a specified short message entity (SME).
    SubmitSm,
    CommandId::SubmitSm
);

message_id_response!(
    /// Carries the SMSC assigned message_id used to query, cancel or replace the message later
    SubmitSmResponse,
    CommandId::SubmitSmResp
);
