//! Range query helpers for the expiry index.

/// Key for the time-ordered expiry index.
///
/// Timestamps are zero-padded so lexicographic order matches numeric order.
pub fn expiry_key(expires_at_ms: i64, id: &str) -> String {
    format!("{:020}:{}", expires_at_ms.max(0), id)
}

/// Exclusive upper bound covering every expiry key at or before `now_ms`.
pub fn expiry_upper_bound(now_ms: i64) -> String {
    format!("{:020};", now_ms.max(0))
}
