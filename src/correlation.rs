//! Matching of responses to the requests that are waiting for them.
//!
//! Every outbound request is registered under its sequence number before its
//! bytes hit the wire. The reader task removes the entry when the response
//! arrives and resolves it; entries nobody answered are swept once their TTL
//! has passed, so a late response finds nothing and is dropped.

use crate::codec::Frame;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

/// How long an unanswered request stays registered
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Minimum spacing between two sweeps of expired entries
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Highest sequence number handed out before wrapping back to 1
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("sequence number {0} is already awaiting a response")]
    DuplicateSequence(u32),
}

/// A request waiting for its response.
///
/// Clones share the same response slot, which accepts exactly one value.
#[derive(Clone)]
pub struct PendingRequest {
    inner: Arc<PendingInner>,
}

struct PendingInner {
    request: Frame,
    response: watch::Sender<Option<Frame>>,
    created: Instant,
}

impl PendingRequest {
    pub fn new(request: Frame) -> Self {
        let (response, _) = watch::channel(None);
        Self {
            inner: Arc::new(PendingInner {
                request,
                response,
                created: Instant::now(),
            }),
        }
    }

    pub fn request(&self) -> &Frame {
        &self.inner.request
    }

    pub fn sequence_number(&self) -> u32 {
        self.inner.request.sequence_number()
    }

    pub fn created(&self) -> Instant {
        self.inner.created
    }

    /// Store the response; only the first call has any effect
    pub fn resolve(&self, response: Frame) -> bool {
        let mut response = Some(response);
        self.inner.response.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = response.take();
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.response.borrow().is_some()
    }

    /// The response, if it arrives within `timeout`
    pub async fn wait(&self, timeout: Duration) -> Option<Frame> {
        let mut rx = self.inner.response.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(response)) => response.clone(),
            _ => None,
        }
    }

    /// Whether both handles refer to the same registration
    pub fn ptr_eq(&self, other: &PendingRequest) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("command_id", &self.inner.request.command_id())
            .field("sequence_number", &self.sequence_number())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Hands out sequence numbers in `1..=MAX_SEQUENCE_NUMBER`, wrapping to 1
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicU32,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub(crate) fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.clamp(1, MAX_SEQUENCE_NUMBER)),
        }
    }

    pub fn next_sequence(&self) -> u32 {
        let advance = |current: u32| {
            Some(if current >= MAX_SEQUENCE_NUMBER {
                1
            } else {
                current + 1
            })
        };
        match self.next.fetch_update(Ordering::Relaxed, Ordering::Relaxed, advance) {
            Ok(current) | Err(current) => current,
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequence number → pending request, with TTL based eviction
#[derive(Debug)]
pub struct CorrelationTable {
    entries: Mutex<Entries>,
    ttl: Duration,
    sweep_interval: Duration,
}

#[derive(Debug)]
struct Entries {
    pending: HashMap<u32, (PendingRequest, Instant)>,
    last_sweep: Instant,
}

impl Entries {
    fn sweep(&mut self, now: Instant, interval: Duration) {
        if now.duration_since(self.last_sweep) < interval {
            return;
        }
        self.last_sweep = now;

        let before = self.pending.len();
        self.pending.retain(|_, (_, expires)| *expires > now);
        let evicted = before - self.pending.len();
        if evicted > 0 {
            debug!("Evicted {} expired pending request(s)", evicted);
        }
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_limits(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                pending: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
            sweep_interval,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, sequence_number: u32, pending: PendingRequest) -> Result<(), CorrelationError> {
        let now = Instant::now();
        let mut entries = self.entries();
        entries.sweep(now, self.sweep_interval);

        if entries.pending.contains_key(&sequence_number) {
            return Err(CorrelationError::DuplicateSequence(sequence_number));
        }
        entries
            .pending
            .insert(sequence_number, (pending, now + self.ttl));
        Ok(())
    }

    pub fn remove(&self, sequence_number: u32) -> Option<PendingRequest> {
        let mut entries = self.entries();
        entries.sweep(Instant::now(), self.sweep_interval);
        entries
            .pending
            .remove(&sequence_number)
            .map(|(pending, _)| pending)
    }

    pub fn len(&self) -> usize {
        self.entries().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
