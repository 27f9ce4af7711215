// ABOUTME: SMPP client error types for session, supervisor and submit operations
// ABOUTME: Wraps wire and codec failures and carries remote command_status rejections

use crate::codec::CodecError;
use crate::connection::WireError;
use crate::datatypes::{CommandId, CommandStatus};
use thiserror::Error;

/// Error type for SMPP client operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// Failure reading or writing PDUs
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// The SMSC answered with a non-zero command_status
    #[error("Protocol error: {0}")]
    Protocol(CommandStatus),

    /// No response arrived in time
    #[error("Operation timeout")]
    Timeout,

    /// No bound session is available to carry the request
    #[error("SMPP session unavailable")]
    Unavailable,

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data validation error (invalid message length, malformed addresses, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unexpected PDU received (wrong response type for request)
    #[error("Unexpected PDU: expected {expected:?}, got {actual:?}")]
    UnexpectedPdu {
        expected: CommandId,
        actual: CommandId,
    },

    /// The SMSC closed the connection while the session was bound
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Session not in correct state for operation
    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl From<CodecError> for SmppError {
    fn from(err: CodecError) -> Self {
        SmppError::Wire(WireError::Decode(err))
    }
}
