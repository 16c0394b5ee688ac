//! Tests for POST /activate

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

#[path = "../common/mod.rs"]
mod common;
use common::*;

use cardgate::error::codes;

fn setup() -> (axum::Router, AppState, tempfile::TempDir) {
    let (state, dir) = create_test_app_state();
    create_test_card(&state.db.get().unwrap(), "ABC123");
    (public_app(state.clone()), state, dir)
}

#[tokio::test]
async fn test_activate_returns_sealed_card_value() {
    let (app, state, _dir) = setup();

    let (status, body) = post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    let (result, x) = open_sealed(body);
    assert_eq!(result, "ABC123");
    assert_eq!(signal::decode("ABC123", &x), Signal::Proceed);

    let card = queries::get_card_by_value(&state.db.get().unwrap(), "ABC123")
        .unwrap()
        .unwrap();
    assert_eq!(card.status, CardStatus::Used);
    assert_eq!(card.seid.as_deref(), Some("device-1"));
}

#[tokio::test]
async fn test_duplicate_activation_keeps_first_binding() {
    let (app, state, _dir) = setup();

    let (first, _) = post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;
    let (second, body) = post_json(&app, "/activate", &signed_request("ABC123", "device-2")).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(open_sealed(body).0, "ABC123");

    let card = queries::get_card_by_value(&state.db.get().unwrap(), "ABC123")
        .unwrap()
        .unwrap();
    assert_eq!(card.seid.as_deref(), Some("device-1"));
}

#[tokio::test]
async fn test_seventh_attempt_signals_back_off() {
    let (app, _state, _dir) = setup();

    let mut signals = Vec::new();
    for _ in 0..7 {
        let (status, body) =
            post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, x) = open_sealed(body);
        signals.push(signal::decode("ABC123", &x));
    }

    assert_eq!(signals[0], Signal::Proceed);
    assert_eq!(signals[6], Signal::BackOff);
}

#[tokio::test]
async fn test_stale_timestamp_rejected_before_anything_else() {
    let (app, state, _dir) = setup();
    let stale = (Utc::now() - Duration::minutes(6)).to_rfc3339();

    let (status, body) = post_json(
        &app,
        "/activate",
        &signed_request_at("ABC123", "device-1", &stale),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], codes::INVALID_PARAMS);
    assert_eq!(body["details"], "invalid timestamp");

    let attempts = queries::list_attempts_for_card(&state.ledger.get().unwrap(), "ABC123").unwrap();
    assert!(attempts.is_empty(), "nothing is recorded before decryption");
}

#[tokio::test]
async fn test_future_timestamp_rejected() {
    let (app, _state, _dir) = setup();
    let ahead = (Utc::now() + Duration::minutes(6)).to_rfc3339();

    let (status, body) = post_json(
        &app,
        "/activate",
        &signed_request_at("ABC123", "device-1", &ahead),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "invalid timestamp");
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let (app, state, _dir) = setup();
    let mut req = signed_request("ABC123", "device-1");
    req.signature = SigningKeys::from_bytes([42u8; 32]).sign(b"something else");

    let (status, body) = post_json(&app, "/activate", &req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "invalid signature");

    let card = queries::get_card_by_value(&state.db.get().unwrap(), "ABC123")
        .unwrap()
        .unwrap();
    assert_eq!(card.status, CardStatus::Unused);
}

#[tokio::test]
async fn test_undecryptable_body_rejected() {
    let (app, _state, _dir) = setup();
    let timestamp = Utc::now().to_rfc3339();
    let data = EnvelopeKey::from_bytes([99u8; 32])
        .encrypt(br#"{"value":"ABC123","seid":"device-1"}"#)
        .unwrap();
    let signature = test_signing_keys().sign(format!("{timestamp}{data}").as_bytes());

    let (status, body) = post_json(
        &app,
        "/activate",
        &json!({ "data": data, "signature": signature, "timestamp": timestamp }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_missing_envelope_fields_rejected() {
    let (app, _state, _dir) = setup();
    let (status, body) = post_json(&app, "/activate", &json!({ "data": "x" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_unknown_card_not_found_and_recorded() {
    let (app, state, _dir) = setup();

    let (status, body) = post_json(&app, "/activate", &signed_request("NOPE", "device-1")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], codes::NOT_FOUND);

    let attempts = queries::list_attempts_for_card(&state.ledger.get().unwrap(), "NOPE").unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].success);
}

#[tokio::test]
async fn test_locked_card_not_available() {
    let (app, state, _dir) = setup();
    queries::transition_card(&state.db.get().unwrap(), "ABC123", |c| c.lock(now())).unwrap();

    let (status, body) = post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], codes::CARD_NOT_AVAILABLE);
}

#[tokio::test]
async fn test_empty_device_id_rejected() {
    let (app, _state, _dir) = setup();

    let (status, body) = post_json(&app, "/activate", &signed_request("ABC123", "")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_broken_ledger_still_returns_committed_activation() {
    let (app, state, _dir) = setup();
    state
        .ledger
        .get()
        .unwrap()
        .execute_batch("DROP TABLE activation_attempts")
        .unwrap();

    let (status, body) = post_json(&app, "/activate", &signed_request("ABC123", "device-1")).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    let (result, x) = open_sealed(body);
    assert_eq!(result, "ABC123");
    assert_eq!(
        signal::decode("ABC123", &x),
        Signal::BackOff,
        "an unreadable ledger signals back-off"
    );

    let card = queries::get_card_by_value(&state.db.get().unwrap(), "ABC123")
        .unwrap()
        .unwrap();
    assert_eq!(card.status, CardStatus::Used);
    assert_eq!(card.seid.as_deref(), Some("device-1"));
}
