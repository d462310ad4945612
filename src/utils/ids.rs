//! Identity tokens for client-local sessions and messages.

use chrono::Utc;

use crate::core::constants::REPLY_ID_PREFIX;

/// Current wall-clock time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Millisecond timestamp paired with random bits, so ids minted within the
/// same millisecond stay distinct.
pub fn unique_id() -> String {
    let mut bytes = [0u8; 4];
    if getrandom::fill(&mut bytes).is_err() {
        // Fall back to sub-millisecond clock bits if the OS source is unavailable.
        let nanos = Utc::now().timestamp_subsec_nanos();
        bytes = nanos.to_le_bytes();
    }
    format!(
        "{}-{:08x}",
        Utc::now().timestamp_millis(),
        u32::from_le_bytes(bytes)
    )
}

/// Placeholder id for an in-flight assistant reply.
pub fn reply_id() -> String {
    format!("{REPLY_ID_PREFIX}{}", unique_id())
}
