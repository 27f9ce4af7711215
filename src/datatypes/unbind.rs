use crate::datatypes::CommandId;

header_only_pdu!(Unbind, CommandId::Unbind);
header_only_pdu!(UnbindResponse, CommandId::UnbindResp);
