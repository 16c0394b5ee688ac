//! Card store queries, including the conditional update

#[path = "../common/mod.rs"]
mod common;
use common::*;

use cardgate::error::AppError;

#[test]
fn test_create_and_get_card() {
    let conn = setup_test_db();
    let created = create_test_card(&conn, "ABC123");

    let by_value = queries::get_card_by_value(&conn, "ABC123").unwrap().unwrap();
    let by_id = queries::get_card_by_id(&conn, &created.id).unwrap().unwrap();

    assert_eq!(by_value, created);
    assert_eq!(by_id, created);
    assert_eq!(created.status, CardStatus::Unused);
    assert!(!created.used);
}

#[test]
fn test_get_missing_card_is_none() {
    let conn = setup_test_db();
    assert!(queries::get_card_by_value(&conn, "nope").unwrap().is_none());
}

#[test]
fn test_create_card_generates_value() {
    let conn = setup_test_db();
    let input = CreateCard {
        value: None,
        app_id: String::new(),
        user_id: String::new(),
        user_name: String::new(),
        days: 1,
        minutes: 0,
        time_type: TimeType::Daily,
        remark: String::new(),
    };
    let card = queries::create_card(&conn, &input).unwrap();
    assert_eq!(card.value.len(), DEFAULT_CARD_VALUE_LENGTH);
}

#[test]
fn test_create_card_rejects_duplicate_value() {
    let conn = setup_test_db();
    create_test_card(&conn, "ABC123");

    let input = CreateCard {
        value: Some("ABC123".to_string()),
        app_id: String::new(),
        user_id: String::new(),
        user_name: String::new(),
        days: 30,
        minutes: 0,
        time_type: TimeType::Monthly,
        remark: String::new(),
    };
    let err = queries::create_card(&conn, &input).unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)), "got {err:?}");
}

#[test]
fn test_create_card_rejects_duration_outside_time_type() {
    let conn = setup_test_db();
    let input = CreateCard {
        value: Some("ABC123".to_string()),
        app_id: String::new(),
        user_id: String::new(),
        user_name: String::new(),
        days: 2,
        minutes: 0,
        time_type: TimeType::Hourly,
        remark: String::new(),
    };
    assert!(matches!(
        queries::create_card(&conn, &input),
        Err(AppError::InvalidParams(_))
    ));
}

#[test]
fn test_conditional_update_applies_once() {
    let conn = setup_test_db();
    let card = create_test_card(&conn, "ABC123");

    let first = match card.activate("device-1", now()).unwrap() {
        ActivationOutcome::Activated(c) => c,
        other => panic!("unexpected {other:?}"),
    };
    let second = match card.activate("device-2", now()).unwrap() {
        ActivationOutcome::Activated(c) => c,
        other => panic!("unexpected {other:?}"),
    };

    assert!(queries::update_card_if_status(&conn, &first, CardStatus::Unused).unwrap());
    assert!(
        !queries::update_card_if_status(&conn, &second, CardStatus::Unused).unwrap(),
        "second writer computed from a stale Unused read and must lose"
    );

    let stored = queries::get_card_by_value(&conn, "ABC123").unwrap().unwrap();
    assert_eq!(stored.seid.as_deref(), Some("device-1"));
    assert_eq!(stored.expired_at, first.expired_at);
}

#[test]
fn test_transition_card() {
    let conn = setup_test_db();
    create_test_card(&conn, "ABC123");

    let locked = queries::transition_card(&conn, "ABC123", |c| c.lock(now())).unwrap();
    assert_eq!(locked.status, CardStatus::Locked);
    assert_eq!(
        queries::get_card_by_value(&conn, "ABC123").unwrap().unwrap().status,
        CardStatus::Locked
    );

    let err = queries::transition_card(&conn, "missing", |c| c.lock(now())).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn test_list_and_count_by_status() {
    let conn = setup_test_db();
    create_test_card(&conn, "A1");
    create_test_card(&conn, "A2");
    create_test_card(&conn, "A3");
    queries::transition_card(&conn, "A3", |c| c.delete(now())).unwrap();

    assert_eq!(queries::count_cards_by_status(&conn, CardStatus::Unused).unwrap(), 2);
    let deleted = queries::list_cards_by_status(&conn, CardStatus::Deleted).unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].value, "A3");
}

#[test]
fn test_corrupt_status_is_an_error_not_a_panic() {
    let conn = setup_test_db();
    create_test_card(&conn, "ABC123");
    // Bypass the CHECK constraint to simulate a corrupted row
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;").unwrap();
    conn.execute("UPDATE cards SET status = 'bogus' WHERE value = 'ABC123'", [])
        .unwrap();

    assert!(queries::get_card_by_value(&conn, "ABC123").is_err());
}
