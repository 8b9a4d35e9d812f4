//! Quota gate — admission control on outgoing advisor turns.
//!
//! The billing subsystem owns the real counter; this is a local mirror
//! that is decremented only when a turn completes successfully.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Remaining permitted turns for the current billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaLimit {
    /// Sentinel: no cap on turns.
    Unlimited,
    /// Finite remaining-turn count.
    Limited(u32),
}

impl QuotaLimit {
    pub fn from_monthly_limit(limit: Option<u32>) -> Self {
        match limit {
            Some(n) => QuotaLimit::Limited(n),
            None => QuotaLimit::Unlimited,
        }
    }
}

impl std::fmt::Display for QuotaLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaLimit::Unlimited => write!(f, "unlimited"),
            QuotaLimit::Limited(n) => write!(f, "{n}"),
        }
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

/// Local mirror of the remaining-turn counter.
pub struct QuotaGate {
    limit: QuotaLimit,
    remaining: Mutex<QuotaLimit>,
}

impl QuotaGate {
    /// Start the mirror at the full period limit.
    pub fn new(limit: QuotaLimit) -> Self {
        Self {
            limit,
            remaining: Mutex::new(limit),
        }
    }

    /// Start the mirror at a known remaining value (e.g. synced from
    /// the billing subsystem mid-period).
    pub fn with_remaining(limit: QuotaLimit, remaining: QuotaLimit) -> Self {
        Self {
            limit,
            remaining: Mutex::new(remaining),
        }
    }

    /// Admission check. Denies only when the counter is finite and
    /// exhausted. Must be evaluated before any transcript mutation.
    pub fn admit(&self) -> Admission {
        match *self.remaining.lock() {
            QuotaLimit::Limited(0) => Admission::Denied,
            _ => Admission::Allowed,
        }
    }

    /// A turn completed successfully: decrement the mirror by one.
    /// Failed turns never reach this.
    pub fn record_success(&self) {
        let mut remaining = self.remaining.lock();
        if let QuotaLimit::Limited(n) = *remaining {
            *remaining = QuotaLimit::Limited(n.saturating_sub(1));
        }
    }

    pub fn remaining(&self) -> QuotaLimit {
        *self.remaining.lock()
    }

    pub fn limit(&self) -> QuotaLimit {
        self.limit
    }
}
