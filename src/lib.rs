//! SMPP v3.4 ESME session manager.
//!
//! The crate keeps a long-lived, bound SMPP session open towards an SMSC. A
//! [`client::Session`] owns one TCP connection and drives it with a reader
//! task and a writer task; a [`client::Supervisor`] keeps a session alive
//! across reconnects, answers keep-alive pings and dispatches inbound
//! requests to application code.
//!
//! ```rust,no_run
//! use smpp_session::client::{BindType, HandlerResult, SessionConfig, SmsMessage, Supervisor};
//! use smpp_session::Frame;
//! use std::time::Duration;
//!
//! // Inbound deliveries are acknowledged with their default response.
//! async fn acknowledge(request: Frame) -> HandlerResult {
//!     Ok(request.create_response())
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("smsc.example.com:2775")
//!     .with_credentials("system_id", "password")
//!     .with_role(BindType::Transceiver)
//!     .with_ping_interval(Duration::from_secs(60));
//!
//! let supervisor = Supervisor::new(config, acknowledge)?;
//! supervisor.start();
//!
//! let message_id = supervisor
//!     .submit(&SmsMessage::new("12345", "test"))
//!     .await?;
//! println!("accepted as {message_id:?}");
//!
//! supervisor.cease().await;
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod client;
pub mod codec;
pub mod connection;
pub mod correlation;
pub mod datatypes;
pub mod queue;
pub mod shutdown;


pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

pub use client::{
    BindCredentials, BindType, InboundHandler, Session, SessionConfig, SessionState, SmppError,
    SmppResult, SmsMessage, Supervisor,
};
