// ABOUTME: Configuration for SMPP sessions and the supervisor that keeps them alive
// ABOUTME: Plain structs with fluent setters, validated once at construction time

use super::error::{SmppError, SmppResult};
use super::types::{BindCredentials, BindType};
use crate::datatypes::{limits, NumericPlanIndicator, TypeOfNumber};
use std::time::Duration;

/// Floor applied to the reconnect delay derived from `request_timeout`
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Source address defaults applied by `Supervisor::submit`
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitConfig {
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,

    /// Send submit_sm without waiting for submit_sm_resp
    pub asynchronous: bool,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: String::new(),
            asynchronous: false,
        }
    }
}

impl SubmitConfig {
    pub fn with_source(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        source_addr: impl Into<String>,
    ) -> Self {
        self.source_addr_ton = ton;
        self.source_addr_npi = npi;
        self.source_addr = source_addr.into();
        self
    }

    builder_setters! {
        with_asynchronous => asynchronous: bool,
    }
}

/// Settings for one SMPP session and the supervisor around it
///
/// # Example
///
/// ```rust
/// use smpp_session::client::{BindType, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::new("localhost:2775")
///     .with_credentials("esme", "secret")
///     .with_role(BindType::Transmitter)
///     .with_ping_interval(Duration::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.reconnect_delay(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// `host:port` of the SMSC
    pub server_address: String,

    /// Deadline for the TCP connect and the bind exchange together
    pub connect_timeout: Duration,

    /// Longest wait for any single response
    pub response_timeout: Duration,

    /// Interval between keep-alive enquire_link PDUs, `None` disables pinging
    pub ping_interval: Option<Duration>,

    pub credentials: BindCredentials,

    /// Default wait for `submit`, also the floor of the reconnect delay
    pub request_timeout: Duration,

    /// Explicit pause between reconnect attempts
    pub reconnect_delay: Option<Duration>,

    /// Unmatched responses tolerated before the session is failed, `None` for no limit
    pub max_unmatched_responses: Option<u32>,

    pub submit: SubmitConfig,
}

impl SessionConfig {
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(3),
            ping_interval: None,
            credentials: BindCredentials::default(),
            request_timeout: Duration::from_secs(30),
            reconnect_delay: None,
            max_unmatched_responses: None,
            submit: SubmitConfig::default(),
        }
    }

    builder_setters! {
        with_connect_timeout => connect_timeout: Duration,
        with_response_timeout => response_timeout: Duration,
        with_request_timeout => request_timeout: Duration,
        with_bind_credentials => credentials: BindCredentials,
        with_submit => submit: SubmitConfig,
    }

    pub fn with_credentials(mut self, system_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials.system_id = system_id.into();
        self.credentials.password = password.into();
        self
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.credentials.system_type = system_type.into();
        self
    }

    pub fn with_role(mut self, role: BindType) -> Self {
        self.credentials.bind_type = role;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = Some(interval);
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    pub fn with_max_unmatched_responses(mut self, limit: u32) -> Self {
        self.max_unmatched_responses = Some(limit);
        self
    }

    pub fn role(&self) -> BindType {
        self.credentials.bind_type
    }

    /// Pause before reconnecting after a failed session
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
            .unwrap_or_else(|| self.request_timeout.max(MIN_RECONNECT_DELAY))
    }

    pub fn validate(&self) -> SmppResult<()> {
        if self.server_address.trim().is_empty() {
            return Err(SmppError::InvalidConfig("server address is empty".into()));
        }

        let positive = [
            ("connect_timeout", Some(self.connect_timeout)),
            ("response_timeout", Some(self.response_timeout)),
            ("request_timeout", Some(self.request_timeout)),
            ("ping_interval", self.ping_interval),
        ];
        for (name, value) in positive {
            if value == Some(Duration::ZERO) {
                return Err(SmppError::InvalidConfig(format!("{name} must be positive")));
            }
        }

        self.credentials.validate()?;

        if self.submit.source_addr.len() > limits::ADDRESS {
            return Err(SmppError::InvalidConfig(format!(
                "source_addr exceeds {} characters",
                limits::ADDRESS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new("localhost:2775");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.response_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.ping_interval, None);
        assert_eq!(config.role(), BindType::Transceiver);
        assert_eq!(config.max_unmatched_responses, None);
        assert!(!config.submit.asynchronous);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reconnect_delay_has_a_floor() {
        let config = SessionConfig::new("x:1").with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(30));

        let config = SessionConfig::new("x:1").with_request_timeout(Duration::from_secs(45));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(45));

        let config = SessionConfig::new("x:1").with_reconnect_delay(Duration::from_millis(200));
        assert_eq!(config.reconnect_delay(), Duration::from_millis(200));
    }

    #[test]
    fn validation_failures() {
        assert!(SessionConfig::new("  ").validate().is_err());
        assert!(SessionConfig::new("x:1")
            .with_response_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SessionConfig::new("x:1")
            .with_ping_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SessionConfig::new("x:1")
            .with_credentials("esme", "password-too-long")
            .validate()
            .is_err());
        assert!(matches!(
            SessionConfig::new("x:1")
                .with_submit(SubmitConfig::default().with_source(
                    TypeOfNumber::Unknown,
                    NumericPlanIndicator::Unknown,
                    "123456789012345678901",
                ))
                .validate(),
            Err(SmppError::InvalidConfig(_))
        ));
    }
}
