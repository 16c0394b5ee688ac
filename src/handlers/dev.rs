//! Dev-only endpoints for issuing and managing cards locally.
//! Mounted only when CARDGATE_ENV=dev.

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use chrono::Utc;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{Card, CreateCard};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminAction {
    Lock,
    Delete,
    Reset,
    Extend { expired_at: i64 },
}

/// POST /dev/cards
pub async fn create_dev_card(
    State(state): State<AppState>,
    Json(input): Json<CreateCard>,
) -> Result<Json<Card>> {
    let conn = state.db.get()?;
    let card = queries::create_card(&conn, &input)?;
    tracing::info!(card_id = %card.id, value = %card.value, "DEV: issued card");
    Ok(Json(card))
}

/// POST /dev/cards/{value}/admin
pub async fn admin_dev_card(
    State(state): State<AppState>,
    Path(value): Path<String>,
    Json(action): Json<AdminAction>,
) -> Result<Json<Card>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    let card = queries::transition_card(&conn, &value, |card| match action {
        AdminAction::Lock => card.lock(now),
        AdminAction::Delete => card.delete(now),
        AdminAction::Reset => card.reset(),
        AdminAction::Extend { expired_at } if expired_at <= now => Err(
            AppError::InvalidParams("expired_at must be in the future".into()),
        ),
        AdminAction::Extend { expired_at } => card.extend(expired_at),
    })?;

    state.coordinator.forget(&value);
    tracing::info!(card_id = %card.id, status = card.status.as_ref(), "DEV: card updated");
    Ok(Json(card))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dev/cards", post(create_dev_card))
        .route("/dev/cards/{value}/admin", post(admin_dev_card))
}
