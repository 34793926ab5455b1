//! Correlation ids for request logging.

use chrono::Utc;

/// Build a correlation id like `REQ_1700000000000` from a prefix and the
/// current time in milliseconds. Ids are for log correlation only and are
/// not guaranteed unique under concurrent calls.
pub fn request_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Utc::now().timestamp_millis())
}
