// ABOUTME: SMPP client module: bound sessions, their supervisor and the supporting types
// ABOUTME: Exports session, supervisor, configuration, keep-alive and error types

//! SMPP Client Module
//!
//! This module keeps an ESME bound to an SMSC:
//!
//! * **Session** - one TCP connection driven by a reader task and a writer task;
//!   binds first, correlates responses to requests, unbinds on stop
//! * **Supervisor** - recreates the session after failures, pings it and
//!   dispatches inbound requests to application code
//! * **Keep-alive** - enquire_link liveness checks for long-running sessions
//!
//! ## Using a session directly
//!
//! ```rust,no_run
//! use smpp_session::client::{Session, SessionConfig};
//! use smpp_session::datatypes::EnquireLink;
//! use smpp_session::Frame;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(
//!     SessionConfig::new("localhost:2775").with_credentials("system_id", "password"),
//! )?;
//! session.start().await?;
//!
//! // The sequence number is assigned by the session
//! let pong = session
//!     .send(Frame::EnquireLink(EnquireLink::new(1)), Some(Duration::from_secs(2)))
//!     .await?;
//! assert!(pong.is_some());
//!
//! session.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Long-running applications
//!
//! A [`Supervisor`] reconnects with a back-off after failures and treats an
//! unanswered enquire_link as a dead link:
//!
//! ```rust,no_run
//! use smpp_session::client::{HandlerResult, SessionConfig, SmsMessage, Supervisor};
//! use smpp_session::Frame;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("localhost:2775")
//!     .with_credentials("system_id", "password")
//!     .with_ping_interval(Duration::from_secs(30))
//!     .with_reconnect_delay(Duration::from_secs(10));
//!
//! let supervisor = Supervisor::new(config, |request: Frame| async move {
//!     HandlerResult::Ok(request.create_response())
//! })?;
//! supervisor.start();
//!
//! let message_id = supervisor.submit(&SmsMessage::new("987654321", "Hello!")).await?;
//! println!("{message_id:?} {:?}", supervisor.keep_alive_status());
//!
//! supervisor.cease().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod keepalive;
pub mod session;
pub mod supervisor;
pub mod types;

// Re-export the main types for easy access
pub use config::{SessionConfig, SubmitConfig};
pub use error::{SmppError, SmppResult};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use session::{Session, SessionChannels, SessionState};
pub use supervisor::{HandlerResult, InboundHandler, Supervisor};
pub use types::{BindCredentials, BindType, MessageBody, SmsMessage, SmsOptions};
