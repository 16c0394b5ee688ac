//! Activation coordinator: the request path for activating a card, checking
//! its status and computing the abuse signal.
//!
//! Holds the two TTL caches. The caches only short-circuit reads; exclusive
//! activation is guaranteed by the store's conditional update.

use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

use crate::cache::TtlCache;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{ActivationOutcome, Card, CardStatus, CreateActivationAttempt};
use crate::signal::{Signal, ThrottlePolicy};

pub struct Coordinator {
    /// value -> card snapshot of a recent successful activation
    activations: TtlCache<String, Card>,
    /// (value, seid) -> validity
    statuses: TtlCache<(String, String), bool>,
    policy: ThrottlePolicy,
}

impl Coordinator {
    pub fn new(cache_ttl: Duration, policy: ThrottlePolicy) -> Self {
        Self {
            activations: TtlCache::new(cache_ttl),
            statuses: TtlCache::new(cache_ttl),
            policy,
        }
    }

    /// Activate the card `value` for device `seid`.
    ///
    /// Repeating a successful activation returns the same card. Every call
    /// appends one ledger entry. A missing or failing ledger is logged and
    /// never changes the outcome.
    pub fn activate(
        &self,
        db: &Connection,
        ledger: Option<&Connection>,
        value: &str,
        seid: &str,
    ) -> Result<Card> {
        let result = self.activate_card(db, value, seid);

        let request_data = json!({ "value": value, "seid": seid }).to_string();
        let attempt = match &result {
            Ok(card) => CreateActivationAttempt {
                card_value: value.to_string(),
                success: true,
                error_message: None,
                request_data: Some(request_data),
                response_data: serde_json::to_string(card).ok(),
            },
            Err(e) => CreateActivationAttempt {
                card_value: value.to_string(),
                success: false,
                error_message: Some(e.ledger_message()),
                request_data: Some(request_data),
                response_data: Some(json!({ "code": e.code() }).to_string()),
            },
        };
        match ledger.map(|conn| queries::create_activation_attempt(conn, &attempt)) {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::error!(
                    card_value = value,
                    error = %e,
                    "Failed to record activation attempt"
                );
            }
            None => {
                tracing::error!(
                    card_value = value,
                    "Ledger unavailable, activation attempt not recorded"
                );
            }
        }

        result
    }

    fn activate_card(&self, db: &Connection, value: &str, seid: &str) -> Result<Card> {
        if let Some(card) = self.activations.get(value) {
            tracing::debug!(card_value = value, "Activation served from dedup cache");
            return Ok(card);
        }

        let card = queries::get_card_by_value(db, value)?
            .ok_or_else(|| AppError::NotFound("card not found".into()))?;

        let activated = match card.activate(seid, Utc::now().timestamp())? {
            ActivationOutcome::AlreadyActive(card) => return Ok(card),
            ActivationOutcome::Activated(card) => card,
        };

        if !queries::update_card_if_status(db, &activated, CardStatus::Unused)? {
            // Another request moved the card between our read and write.
            return match queries::get_card_by_value(db, value)? {
                Some(winner) if winner.status == CardStatus::Used => {
                    tracing::debug!(card_value = value, "Lost activation race, returning winner");
                    Ok(winner)
                }
                _ => Err(AppError::InvalidState("card is no longer available".into())),
            };
        }

        tracing::info!(
            card_id = %activated.id,
            seid,
            expired_at = activated.expired_at,
            "Card activated"
        );
        self.activations.insert(value.to_string(), activated.clone());
        self.statuses.remove_where(|(v, _)| v == value);
        Ok(activated)
    }

    /// Whether device `seid` currently holds a valid activation of `value`.
    /// Unknown cards are simply not valid.
    pub fn check_status(&self, db: &Connection, value: &str, seid: &str) -> Result<bool> {
        let key = (value.to_string(), seid.to_string());
        if let Some(valid) = self.statuses.get(&key) {
            return Ok(valid);
        }

        let now = Utc::now().timestamp();
        let card = queries::get_card_by_value(db, value)?;
        let valid = card.as_ref().is_some_and(|c| c.is_usable_by(seid, now));

        // A positive answer must not outlive the card itself.
        match card.and_then(|c| c.expired_at).filter(|_| valid) {
            Some(expired_at) => {
                let remaining = Duration::from_secs((expired_at - now).max(0) as u64);
                self.statuses.insert_with_ttl(key, true, remaining);
            }
            None => self.statuses.insert(key, false),
        }
        Ok(valid)
    }

    /// Throttle signal for `value` from its ledger history.
    pub fn abuse_signal(&self, ledger: &Connection, value: &str) -> Result<Signal> {
        let counts = queries::attempt_counts(ledger, value, Utc::now().timestamp())?;
        let signal = self.policy.signal_for(counts);
        if signal == Signal::BackOff {
            tracing::warn!(
                card_value = value,
                total = counts.total,
                last_hour = counts.last_hour,
                "Activation attempts over threshold"
            );
        }
        Ok(signal)
    }

    /// Like [`Self::abuse_signal`], but a missing or failing ledger yields
    /// `BackOff` instead of an error.
    pub fn throttle_signal(&self, ledger: Option<&Connection>, value: &str) -> Signal {
        let Some(ledger) = ledger else {
            tracing::error!(card_value = value, "Ledger unavailable, signalling back-off");
            return Signal::BackOff;
        };
        self.abuse_signal(ledger, value).unwrap_or_else(|e| {
            tracing::error!(
                card_value = value,
                error = %e,
                "Failed to count attempts, signalling back-off"
            );
            Signal::BackOff
        })
    }

    /// Drop cached state for `value` after an out-of-band change to the card.
    pub fn forget(&self, value: &str) {
        self.activations.remove(value);
        self.statuses.remove_where(|(v, _)| v == value);
    }

    /// Reclaim expired cache entries. Returns how many were removed.
    pub fn sweep_caches(&self) -> usize {
        self.activations.purge_expired() + self.statuses.purge_expired()
    }
}
