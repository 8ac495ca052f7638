//! Exponential backoff with jitter for C6's network-error retry path.
//! C9's separate `6024` retry policy lives in `vlink-command` and does
//! not use this helper — the two react to different signals (I/O
//! failure vs. a parsed server code) and are deliberately not shared.

use std::time::Duration;

use rand::Rng;

const BASE: Duration = Duration::from_millis(500);
const FACTOR: u32 = 2;
const JITTER_FRACTION: f64 = 0.2;

/// Delay before retry attempt `attempt` (0-indexed): `base * factor^attempt`,
/// jittered by up to ±20%.
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let unjittered = BASE.as_millis() as u64 * (FACTOR as u64).pow(attempt);
    let jitter_range = (unjittered as f64 * JITTER_FRACTION) as i64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(-jitter_range..=jitter_range)
    } else {
        0
    };
    let jittered = (unjittered as i64 + jitter).max(0) as u64;
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_within_jitter_bounds() {
        for attempt in 0..3 {
            let delay = delay_for_attempt(attempt);
            let base = BASE.as_millis() as u64 * 2u64.pow(attempt);
            let lower = (base as f64 * (1.0 - JITTER_FRACTION)) as u64;
            let upper = (base as f64 * (1.0 + JITTER_FRACTION)) as u64;
            assert!(delay.as_millis() as u64 >= lower);
            assert!(delay.as_millis() as u64 <= upper);
        }
    }
}
