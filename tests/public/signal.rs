//! Tests for POST /signal

use axum::http::StatusCode;

#[path = "../common/mod.rs"]
mod common;
use common::*;

#[tokio::test]
async fn test_signal_for_fresh_card_is_proceed() {
    let (state, _dir) = create_test_app_state();
    create_test_card(&state.db.get().unwrap(), "ABC123");
    let app = public_app(state);

    let (status, body) = post_json(&app, "/signal", &signed_request("ABC123", "")).await;
    assert_eq!(status, StatusCode::OK);

    let (result, x) = open_sealed(body);
    assert_eq!(result, "ABC123");
    assert_eq!(signal::decode("ABC123", &x), Signal::Proceed);
}

#[tokio::test]
async fn test_signal_reflects_attempt_history_without_recording() {
    let (state, _dir) = create_test_app_state();
    create_test_card(&state.db.get().unwrap(), "ABC123");
    let app = public_app(state.clone());

    for _ in 0..4 {
        post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;
    }

    let (_, body) = post_json(&app, "/signal", &signed_request("ABC123", "")).await;
    let (_, x) = open_sealed(body);
    assert_eq!(signal::decode("ABC123", &x), Signal::BackOff);

    let attempts = queries::list_attempts_for_card(&state.ledger.get().unwrap(), "ABC123").unwrap();
    assert_eq!(attempts.len(), 4, "the signal endpoint never writes the ledger");
}
