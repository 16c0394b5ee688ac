//! Attempt ledger queries

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn attempt(value: &str, success: bool) -> CreateActivationAttempt {
    CreateActivationAttempt {
        card_value: value.to_string(),
        success,
        error_message: (!success).then(|| "card not found".to_string()),
        request_data: Some(format!(r#"{{"value":"{value}","seid":"d"}}"#)),
        response_data: None,
    }
}

#[test]
fn test_attempts_are_appended() {
    let ledger = setup_test_ledger_db();
    let first = queries::create_activation_attempt(&ledger, &attempt("ABC123", true)).unwrap();
    let second = queries::create_activation_attempt(&ledger, &attempt("ABC123", false)).unwrap();
    assert!(second.id > first.id);

    let stored = queries::list_attempts_for_card(&ledger, "ABC123").unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].success);
    assert!(!stored[1].success);
    assert_eq!(stored[1].error_message.as_deref(), Some("card not found"));
}

#[test]
fn test_attempt_counts_split_by_hour() {
    let ledger = setup_test_ledger_db();
    let at = now();
    for offset in [10, 100, 3599, 3600, 7200] {
        ledger
            .execute(
                "INSERT INTO activation_attempts (card_value, activation_at, success, created_at)
                 VALUES ('ABC123', ?1, 1, ?1)",
                [at - offset],
            )
            .unwrap();
    }
    queries::create_activation_attempt(&ledger, &attempt("OTHER", true)).unwrap();

    let counts = queries::attempt_counts(&ledger, "ABC123", at).unwrap();
    assert_eq!(counts.total, 5);
    assert_eq!(counts.last_hour, 3, "exactly one hour ago is outside the window");
}

#[test]
fn test_attempt_counts_for_unknown_value_are_zero() {
    let ledger = setup_test_ledger_db();
    let counts = queries::attempt_counts(&ledger, "nothing", now()).unwrap();
    assert_eq!(counts, AttemptCounts::default());
}
