//! Humanized pacing between UI interactions.
//!
//! Every pause in the engine goes through these helpers so pacing stays
//! uniformly jittered rather than mechanical.

use std::time::Duration;

use rand::Rng;

/// Sleep a uniformly random number of milliseconds in `[min_ms, max_ms]`.
pub async fn random_delay(min_ms: u64, max_ms: u64) {
    let delay = jittered_millis(min_ms, max_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Sleep `base_ms` plus a random variance, with a small extra micro-jitter.
pub async fn human_delay(base_ms: u64, variance_ms: u64) {
    let delay = base_ms + rand::thread_rng().gen_range(0..=variance_ms);
    let micro = rand::thread_rng().gen_range(0..=100);
    tokio::time::sleep(Duration::from_millis(delay + micro)).await;
}

/// Uniform random integer in `[min_ms, max_ms]` (inclusive, order-tolerant).
pub fn jittered_millis(min_ms: u64, max_ms: u64) -> u64 {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    rand::thread_rng().gen_range(lo..=hi)
}

/// Backoff delay for retry attempt `attempt` (1-based) with ±20% jitter.
pub fn backoff_with_jitter(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let base_delay = base_ms * 2u64.pow(attempt.saturating_sub(1).min(5));
    let capped = base_delay.min(max_ms);

    let jitter_range = capped / 5;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
    } else {
        0
    };

    Duration::from_millis((capped as i64 + jitter).max(0) as u64)
}
