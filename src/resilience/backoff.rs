//! Retry backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before same-backend retry number `retry + 1`.
///
/// Grows linearly: `base_ms * (retry + 1)`, capped at `max_ms`.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(u64::from(retry) + 1);
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Add 0 to 10% random jitter to `delay`.
pub fn with_jitter(delay: Duration) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
