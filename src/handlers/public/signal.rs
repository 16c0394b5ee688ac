use axum::extract::State;

use crate::db::AppState;
use crate::envelope::{SealedResponse, SignedRequest};
use crate::error::Result;
use crate::extractors::Json;
use crate::signal;

/// POST /signal
///
/// Reports the abuse signal for a card from its ledger history alone.
/// Read-only: no card change and no ledger entry.
pub async fn card_signal(
    State(state): State<AppState>,
    Json(req): Json<SignedRequest>,
) -> Result<Json<SealedResponse>> {
    let body = req.open(&state.replay, &state.signing, &state.envelope)?;

    let ledger = state.ledger.get()?;
    let signal = state.coordinator.abuse_signal(&ledger, &body.value)?;

    let sealed = SealedResponse::seal(
        &state.envelope,
        &state.signing,
        &body.value,
        signal::encode(&body.value, signal),
    )?;
    Ok(Json(sealed))
}
