//! HTTP client module
//!
//! Request executor shared by every stream and the report reconciler.
//!
//! # Features
//!
//! - **Automatic Retries**: transient failures (timeouts, connect errors,
//!   429, 5xx) are retried with backoff
//! - **Rate Limiting**: token bucket rate limiter using governor
//! - **Authentication**: bearer token from the owned `Authenticator`
//!
//! Other statuses are returned to the caller uninterpreted, so callers can
//! branch on 200 vs. anything else.

mod client;
mod rate_limit;

pub use client::{read_json, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
