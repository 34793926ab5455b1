//! Utility modules shared across the pipeline.
//!
//! - [`HttpClient`]: reqwest wrapper with shared timeouts and user agent
//! - [`ApiRateLimiter`]: per-second quota gate for outbound API calls
//! - [`request_id`]: millisecond-timestamp correlation ids for logging

mod http;
mod ids;
mod rate_limit;

pub use http::HttpClient;
pub use ids::request_id;
pub use rate_limit::ApiRateLimiter;
