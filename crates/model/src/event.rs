//! Event ID generation

use std::time::{SystemTime, UNIX_EPOCH};

use reflex_executor::md5_hex;

/// 4-hex-character event tag for one inbound payload.
///
/// Derived from the MD5 of the nanosecond timestamp, so concurrent payloads
/// get distinct tags without any shared counter state.
pub fn event_id(now: SystemTime) -> String {
    let nanos = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    md5_hex(&nanos.to_string())[..4].to_owned()
}
