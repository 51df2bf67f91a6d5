// src/clock/deadline.rs

use std::time::{Duration, Instant};

/// Turn a relative timeout in milliseconds into an absolute deadline.
///
/// `0` means "no deadline".
pub fn deadline_after(timeout_ms: u64) -> Option<Instant> {
    if timeout_ms == 0 {
        return None;
    }
    Some(Instant::now() + Duration::from_millis(timeout_ms))
}
