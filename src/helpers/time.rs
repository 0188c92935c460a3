use chrono::Utc;
use tokio::time::Instant;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// `expires_in` seconds from now as a unix timestamp
pub fn expires_at_from_now(expires_in: i64) -> i64 {
    now_i64().saturating_add(expires_in)
}
