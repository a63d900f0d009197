//! Middleware settings for the layers applied in [`super::router::build`].
//!
//! The router attaches request tracing, a per-request timeout, and response
//! compression.

use std::time::Duration;

/// Per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
