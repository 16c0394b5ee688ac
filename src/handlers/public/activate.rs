use axum::extract::State;

use crate::db::AppState;
use crate::envelope::{SealedResponse, SignedRequest};
use crate::error::Result;
use crate::extractors::Json;
use crate::signal;

/// POST /activate
///
/// Binds an Unused card to the requesting device. Repeating the request
/// returns the same card. `rs` carries the encrypted card value. Once the
/// card is bound, ledger trouble only affects `x`, never the response.
pub async fn activate_card(
    State(state): State<AppState>,
    Json(req): Json<SignedRequest>,
) -> Result<Json<SealedResponse>> {
    let body = req.open(&state.replay, &state.signing, &state.envelope)?;

    let conn = state.db.get()?;
    let ledger = state
        .ledger
        .get()
        .inspect_err(|e| tracing::error!(error = %e, "Failed to get ledger connection"))
        .ok();

    let card = state
        .coordinator
        .activate(&conn, ledger.as_deref(), &body.value, &body.seid)?;
    let signal = state
        .coordinator
        .throttle_signal(ledger.as_deref(), &body.value);

    let sealed = SealedResponse::seal(
        &state.envelope,
        &state.signing,
        &card.value,
        signal::encode(&body.value, signal),
    )?;
    Ok(Json(sealed))
}
