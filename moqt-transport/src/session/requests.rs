use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::SessionError;

/// Allocates outgoing request ids and enforces the peer-granted ceiling.
///
/// The side that initiated the QUIC connection uses even ids starting at 0;
/// the accepting side uses odd ids starting at 1. Both step by 2, so every
/// in-flight id is unique across the session.
pub struct RequestIds {
    next: AtomicU64,

    /// One past the largest id the peer allows, from SETUP or MAX_REQUEST_ID.
    max_allowed: AtomicU64,

    /// Set once REQUESTS_BLOCKED has been sent for the current ceiling.
    blocked_sent: AtomicBool,

    /// Set when the session is draining; no further allocation or grants.
    frozen: AtomicBool,
}

impl RequestIds {
    pub fn new(is_client: bool, max_allowed: u64) -> Self {
        Self {
            next: AtomicU64::new(if is_client { 0 } else { 1 }),
            max_allowed: AtomicU64::new(max_allowed),
            blocked_sent: AtomicBool::new(false),
            frozen: AtomicBool::new(false),
        }
    }

    /// Claim the next request id, failing when the ceiling is reached.
    pub fn next(&self) -> Result<u64, SessionError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(SessionError::RequestIdExhausted);
        }

        let id = self.next.load(Ordering::Acquire);
        if id >= self.max_allowed.load(Ordering::Acquire) {
            return Err(SessionError::RequestIdExhausted);
        }

        // Only the session task allocates, so a plain store is enough.
        self.next.store(id + 2, Ordering::Release);
        Ok(id)
    }

    /// Stop allocating entirely, e.g. once the session starts draining.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Raise the ceiling from a MAX_REQUEST_ID. Lowering is ignored, as is
    /// any grant once the session is draining.
    pub fn grant(&self, max_allowed: u64) {
        if self.frozen.load(Ordering::Acquire) {
            return;
        }

        let prev = self.max_allowed.fetch_max(max_allowed, Ordering::AcqRel);
        if max_allowed > prev {
            self.blocked_sent.store(false, Ordering::Release);
        }
    }

    /// The ceiling to report in REQUESTS_BLOCKED, at most once per grant.
    pub fn take_blocked_signal(&self) -> Option<u64> {
        if self.frozen.load(Ordering::Acquire) {
            return None;
        }

        let id = self.next.load(Ordering::Acquire);
        let max = self.max_allowed.load(Ordering::Acquire);
        if id < max {
            return None;
        }

        match self
            .blocked_sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(max),
            Err(_) => None,
        }
    }

    pub fn max_allowed(&self) -> u64 {
        self.max_allowed.load(Ordering::Acquire)
    }
}
