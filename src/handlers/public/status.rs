use axum::extract::State;

use crate::db::AppState;
use crate::envelope::{SealedResponse, SignedRequest};
use crate::error::Result;
use crate::extractors::Json;
use crate::signal::{self, Signal};

/// POST /status
///
/// `rs` is the encrypted string "true" or "false". An invalid card also
/// carries a BackOff signal, so a stripped `rs` still tells the client to stop.
pub async fn check_card_status(
    State(state): State<AppState>,
    Json(req): Json<SignedRequest>,
) -> Result<Json<SealedResponse>> {
    let body = req.open(&state.replay, &state.signing, &state.envelope)?;

    let conn = state.db.get()?;
    let valid = state
        .coordinator
        .check_status(&conn, &body.value, &body.seid)?;

    let sealed = SealedResponse::seal(
        &state.envelope,
        &state.signing,
        if valid { "true" } else { "false" },
        signal::encode(&body.value, Signal::back_off_if(!valid)),
    )?;
    Ok(Json(sealed))
}
