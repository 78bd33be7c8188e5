//! Time utilities shared by the history and authorization layers.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current system time.
pub fn now() -> SystemTime {
    SystemTime::now()
}

/// Returns the current time as whole milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
