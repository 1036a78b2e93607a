//! Request-scoped retry counters.

/// Counters carried by one logical request through dispatch and retries.
///
/// They live with the request, never on shared pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCounters {
    /// Dispatch number for this request; 1 on first entry, +1 per failover.
    pub attempts: u32,
    /// Same-backend retries already made for the current backend.
    pub retries: u32,
}

impl RequestCounters {
    pub fn new(attempts: u32, retries: u32) -> Self {
        Self { attempts, retries }
    }

    /// Counters for the next retry against the same backend.
    pub fn next_retry(self) -> Self {
        Self {
            retries: self.retries.saturating_add(1),
            ..self
        }
    }

    /// Counters for re-dispatch after a failover. The next backend starts
    /// with a fresh retry budget.
    pub fn next_attempt(self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            retries: 0,
        }
    }
}

impl Default for RequestCounters {
    fn default() -> Self {
        Self {
            attempts: 1,
            retries: 0,
        }
    }
}
