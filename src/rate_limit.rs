//! Per-IP rate limiting for public endpoints.
//!
//! Tiers:
//! - Standard: /activate, /status, /signal (envelope crypto + DB work)
//! - Relaxed: /health
//!
//! Configure via environment variables:
//! - RATE_LIMIT_STANDARD_RPM (default: 30)
//! - RATE_LIMIT_RELAXED_RPM (default: 60)
//!
//! Exceeding a tier yields a plain 429 from the governor layer; the
//! per-card abuse signal is separate and never rejects requests.

use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;

pub const DEFAULT_STANDARD_RPM: u32 = 30;
pub const DEFAULT_RELAXED_RPM: u32 = 60;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub standard_rpm: u32,
    pub relaxed_rpm: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            standard_rpm: DEFAULT_STANDARD_RPM,
            relaxed_rpm: DEFAULT_RELAXED_RPM,
        }
    }
}

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Creates a rate limiter layer allowing `requests_per_minute` per IP.
fn create_layer(requests_per_minute: u32) -> RateLimitLayer {
    let requests_per_minute = requests_per_minute.max(1);
    let period_secs = 60 / requests_per_minute as u64;
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs.max(1)))
        .burst_size(requests_per_minute)
        .finish()
        .expect("period and burst size are non-zero");

    GovernorLayer::new(Arc::new(config))
}

pub fn standard_layer(requests_per_minute: u32) -> RateLimitLayer {
    create_layer(requests_per_minute)
}

pub fn relaxed_layer(requests_per_minute: u32) -> RateLimitLayer {
    create_layer(requests_per_minute)
}
