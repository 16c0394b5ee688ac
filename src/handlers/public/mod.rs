mod activate;
mod signal;
mod status;

pub use activate::*;
pub use signal::*;
pub use status::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;
use crate::rate_limit::{self, RateLimitConfig};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public endpoints, each tier behind its own per-IP rate limit.
pub fn router(rate_limit: RateLimitConfig) -> Router<AppState> {
    let envelope_routes = Router::new()
        .route("/activate", post(activate_card))
        .route("/status", post(check_card_status))
        .route("/signal", post(card_signal))
        .layer(rate_limit::standard_layer(rate_limit.standard_rpm));

    let health_routes = Router::new()
        .route("/health", get(health))
        .layer(rate_limit::relaxed_layer(rate_limit.relaxed_rpm));

    Router::new().merge(envelope_routes).merge(health_routes)
}
