use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Round-trip time for a probe sent at `sent_ms`, if the timestamp is not in the future
pub fn elapsed_since(sent_ms: u64, now_ms: u64) -> Option<Duration> {
    now_ms.checked_sub(sent_ms).map(Duration::from_millis)
}
