use chrono::Utc;
use rusqlite::{Connection, ErrorCode, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{ATTEMPT_COLS, CARD_COLS, query_all, query_one};

const ONE_HOUR_SECS: i64 = 3600;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ============ Cards ============

/// Issue a new Unused card.
///
/// The duration is checked against the card's `time_type`; a missing value
/// is generated.
pub fn create_card(conn: &Connection, input: &CreateCard) -> Result<Card> {
    if !input.time_type.accepts(input.days, input.minutes) {
        return Err(AppError::InvalidParams(format!(
            "{} days {} minutes is not a valid {} duration",
            input.days,
            input.minutes,
            input.time_type.as_ref()
        )));
    }

    let value = match input.value.as_deref().map(str::trim) {
        Some("") => return Err(AppError::InvalidParams("card value must not be empty".into())),
        Some(v) => v.to_string(),
        None => generate_card_value("", DEFAULT_CARD_VALUE_LENGTH),
    };

    let card = Card {
        id: gen_id(),
        value,
        app_id: input.app_id.clone(),
        user_id: input.user_id.clone(),
        user_name: input.user_name.clone(),
        days: input.days,
        minutes: input.minutes,
        time_type: input.time_type,
        status: CardStatus::Unused,
        used: false,
        seid: None,
        used_at: None,
        locked_at: None,
        deleted_at: None,
        expired_at: None,
        remark: input.remark.clone(),
        created_at: now(),
    };

    conn.execute(
        &format!(
            "INSERT INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            CARD_COLS
        ),
        params![
            &card.id,
            &card.value,
            &card.app_id,
            &card.user_id,
            &card.user_name,
            card.days,
            card.minutes,
            card.time_type.as_ref(),
            card.status.as_ref(),
            card.used as i32,
            &card.seid,
            card.used_at,
            card.locked_at,
            card.deleted_at,
            card.expired_at,
            &card.remark,
            card.created_at,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::InvalidParams(format!("card value {} already exists", card.value))
        } else {
            e.into()
        }
    })?;

    Ok(card)
}

pub fn get_card_by_id(conn: &Connection, id: &str) -> Result<Option<Card>> {
    query_one(
        conn,
        &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLS),
        &[&id],
    )
}

pub fn get_card_by_value(conn: &Connection, value: &str) -> Result<Option<Card>> {
    query_one(
        conn,
        &format!("SELECT {} FROM cards WHERE value = ?1", CARD_COLS),
        &[&value],
    )
}

/// Write every mutable field of `card`, but only if the stored row is still in
/// the `expected` status.
///
/// Returns `false` when another writer moved the card first. This is the
/// compare-and-swap the activation path relies on.
pub fn update_card_if_status(conn: &Connection, card: &Card, expected: CardStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE cards SET status = ?1, used = ?2, seid = ?3, used_at = ?4, locked_at = ?5,
                deleted_at = ?6, expired_at = ?7
         WHERE id = ?8 AND status = ?9",
        params![
            card.status.as_ref(),
            card.used as i32,
            &card.seid,
            card.used_at,
            card.locked_at,
            card.deleted_at,
            card.expired_at,
            &card.id,
            expected.as_ref(),
        ],
    )?;
    Ok(affected > 0)
}

/// Apply an administrative transition to the card with `value`.
///
/// The write is conditional on the status the transition was computed from,
/// so a concurrent activation is never silently overwritten.
pub fn transition_card<F>(conn: &Connection, value: &str, transition: F) -> Result<Card>
where
    F: FnOnce(&Card) -> Result<Card>,
{
    let current = get_card_by_value(conn, value)?
        .ok_or_else(|| AppError::NotFound("card not found".into()))?;
    let next = transition(&current)?;

    if !update_card_if_status(conn, &next, current.status)? {
        return Err(AppError::InvalidState(
            "card changed concurrently, retry".into(),
        ));
    }
    Ok(next)
}

pub fn list_cards_by_status(conn: &Connection, status: CardStatus) -> Result<Vec<Card>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM cards WHERE status = ?1 ORDER BY created_at DESC",
            CARD_COLS
        ),
        &[&status.as_ref()],
    )
}

pub fn count_cards_by_status(conn: &Connection, status: CardStatus) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM cards WHERE status = ?1",
        params![status.as_ref()],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

// ============ Activation Ledger ============

pub fn create_activation_attempt(
    conn: &Connection,
    input: &CreateActivationAttempt,
) -> Result<ActivationAttempt> {
    let timestamp = now();
    conn.execute(
        "INSERT INTO activation_attempts (card_value, activation_at, success, error_message, request_data, response_data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &input.card_value,
            timestamp,
            input.success as i32,
            &input.error_message,
            &input.request_data,
            &input.response_data,
            timestamp,
        ],
    )?;

    Ok(ActivationAttempt {
        id: conn.last_insert_rowid(),
        card_value: input.card_value.clone(),
        activation_at: timestamp,
        success: input.success,
        error_message: input.error_message.clone(),
        request_data: input.request_data.clone(),
        response_data: input.response_data.clone(),
        created_at: timestamp,
    })
}

pub fn list_attempts_for_card(
    conn: &Connection,
    card_value: &str,
) -> Result<Vec<ActivationAttempt>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM activation_attempts WHERE card_value = ?1 ORDER BY id",
            ATTEMPT_COLS
        ),
        &[&card_value],
    )
}

/// Lifetime and trailing-hour attempt counts for a card value, as of `at`.
pub fn attempt_counts(conn: &Connection, card_value: &str, at: i64) -> Result<AttemptCounts> {
    let hour_ago = at - ONE_HOUR_SECS;
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN activation_at > ?2 AND activation_at <= ?3 THEN 1 ELSE 0 END), 0)
         FROM activation_attempts
         WHERE card_value = ?1",
        params![card_value, hour_ago, at],
        |row| {
            Ok(AttemptCounts {
                total: row.get(0)?,
                last_hour: row.get(1)?,
            })
        },
    )
    .map_err(Into::into)
}
