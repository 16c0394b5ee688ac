//! Row mapping trait and helpers shared by the card store and the ledger.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a text column into an enum, surfacing bad values as a column type
/// error instead of panicking.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const CARD_COLS: &str = "id, value, app_id, user_id, user_name, days, minutes, time_type, status, used, seid, used_at, locked_at, deleted_at, expired_at, remark, created_at";

pub const ATTEMPT_COLS: &str = "id, card_value, activation_at, success, error_message, request_data, response_data, created_at";

// ============ FromRow Implementations ============

impl FromRow for Card {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Card {
            id: row.get(0)?,
            value: row.get(1)?,
            app_id: row.get(2)?,
            user_id: row.get(3)?,
            user_name: row.get(4)?,
            days: row.get(5)?,
            minutes: row.get(6)?,
            time_type: parse_enum(row, 7, "time_type")?,
            status: parse_enum(row, 8, "status")?,
            used: row.get::<_, i32>(9)? != 0,
            seid: row.get(10)?,
            used_at: row.get(11)?,
            locked_at: row.get(12)?,
            deleted_at: row.get(13)?,
            expired_at: row.get(14)?,
            remark: row.get(15)?,
            created_at: row.get(16)?,
        })
    }
}

impl FromRow for ActivationAttempt {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ActivationAttempt {
            id: row.get(0)?,
            card_value: row.get(1)?,
            activation_at: row.get(2)?,
            success: row.get::<_, i32>(3)? != 0,
            error_message: row.get(4)?,
            request_data: row.get(5)?,
            response_data: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}
