// ABOUTME: SMPP keep-alive tracking for supervised sessions
// ABOUTME: Decides when to send enquire_link and whether the outstanding one was answered in time

use crate::correlation::PendingRequest;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for SMPP keep-alive functionality
///
/// According to SMPP v3.4, enquire_link PDUs may be sent periodically to
/// verify the link is still alive. The SMSC should answer each one with an
/// enquire_link_resp within a reasonable time.
///
/// # Example
///
/// ```rust
/// use smpp_session::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// let config = KeepAliveConfig::new(Duration::from_secs(60))
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.max_failures, 1);
/// assert!(!KeepAliveConfig::disabled().enabled);
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs
    pub interval: Duration,

    /// How long the outstanding enquire_link may stay unanswered
    pub timeout: Duration,

    /// Consecutive unanswered pings before the session is considered dead
    pub max_failures: u32,

    /// When false, no enquire_link PDUs are sent
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(3),
            max_failures: 1,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Keep-alive settings for a session: pinging every `ping_interval`,
    /// each ping answered within `response_timeout`
    pub fn for_session(ping_interval: Option<Duration>, response_timeout: Duration) -> Self {
        match ping_interval {
            Some(interval) => Self::new(interval).with_timeout(response_timeout),
            None => Self::disabled(),
        }
    }
}

/// Status information about keep-alive state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepAliveStatus {
    /// Whether keep-alive is currently enabled
    pub running: bool,

    /// enquire_link PDUs that went unanswered in a row
    pub consecutive_failures: u32,

    /// Total enquire_link PDUs sent
    pub total_pings: u32,

    /// Total enquire_link_resp PDUs received in time
    pub total_pongs: u32,

    /// Whether a ping is currently waiting for its response
    pub awaiting_response: bool,
}

/// Tracks keep-alive timing and the outstanding enquire_link of one session
///
/// The supervisor polls it from its service loop:
/// 1. `should_ping()` says whether the interval has elapsed
/// 2. the ping is sent and handed over with `on_ping_sent()`
/// 3. `check_response()` resolves the outstanding ping once answered, or
///    counts a failure once the response clock has run out
/// 4. `is_connection_failed()` tells the supervisor to restart the session
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,

    /// Last time an enquire_link was sent, or the session started
    last_ping: Instant,

    /// The ping waiting for its response and when it was sent
    outstanding: Option<(PendingRequest, Instant)>,

    consecutive_failures: u32,
    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            last_ping: Instant::now(),
            outstanding: None,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    /// Start over for a freshly bound session; totals are kept
    pub fn reset(&mut self) {
        self.last_ping = Instant::now();
        self.outstanding = None;
        self.consecutive_failures = 0;
    }

    /// Check if an enquire_link should be sent now
    pub fn should_ping(&self) -> bool {
        if !self.config.enabled || self.outstanding.is_some() {
            return false;
        }

        if self.is_connection_failed() {
            debug!("Max failures reached, not sending more pings");
            return false;
        }

        self.last_ping.elapsed() >= self.config.interval
    }

    /// Record that an enquire_link was sent and start its response clock
    pub fn on_ping_sent(&mut self, ping: PendingRequest) {
        let now = Instant::now();
        self.last_ping = now;
        self.outstanding = Some((ping, now));
        self.total_pings += 1;
        debug!("Enquire_link sent (total: {})", self.total_pings);
    }

    /// Settle the outstanding ping if it was answered or has run out of time
    pub fn check_response(&mut self) {
        let Some((ping, sent_at)) = &self.outstanding else {
            return;
        };

        if ping.is_resolved() {
            self.outstanding = None;
            self.on_ping_success();
        } else if sent_at.elapsed() >= self.config.timeout {
            let sequence_number = ping.sequence_number();
            self.outstanding = None;
            warn!("Enquire_link {} was not answered in time", sequence_number);
            self.on_ping_failure();
        }
    }

    fn on_ping_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!("Enquire_link successful (total: {})", self.total_pongs);
    }

    /// Record a failed enquire_link, including one that could not be sent
    pub fn on_ping_failure(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            "Enquire_link failed (consecutive failures: {})",
            self.consecutive_failures
        );
    }

    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.config.enabled,
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
            awaiting_response: self.outstanding.is_some(),
        }
    }
}
