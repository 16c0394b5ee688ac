use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{AppError, Result};

const SECONDS_PER_DAY: i64 = 86400;
const SECONDS_PER_MINUTE: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Alphabet for generated card values
const CARD_VALUE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated card values when the issuer does not choose one
pub const DEFAULT_CARD_VALUE_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CardStatus {
    Unused,
    Used,
    Locked,
    Deleted,
}

/// Advisory duration category of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl TimeType {
    /// Allowed total duration in minutes, as `[min, max)`.
    fn minute_range(self) -> (i64, i64) {
        match self {
            TimeType::Hourly => (1, MINUTES_PER_DAY),
            TimeType::Daily => (MINUTES_PER_DAY, 7 * MINUTES_PER_DAY),
            TimeType::Weekly => (7 * MINUTES_PER_DAY, 30 * MINUTES_PER_DAY),
            TimeType::Monthly => (30 * MINUTES_PER_DAY, 365 * MINUTES_PER_DAY),
            TimeType::Yearly => (365 * MINUTES_PER_DAY, 999 * MINUTES_PER_DAY),
        }
    }

    /// Whether `days` + `minutes` is a sensible duration for this category.
    ///
    /// Only checked when cards are issued; activation never consults it.
    pub fn accepts(self, days: i32, minutes: i32) -> bool {
        if days < 0 || minutes < 0 || (days == 0 && minutes == 0) {
            return false;
        }
        let total = days as i64 * MINUTES_PER_DAY + minutes as i64;
        let (min, max) = self.minute_range();
        total >= min && total < max
    }
}

/// A license activation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    /// The activation code itself, unique across cards
    pub value: String,
    pub app_id: String,
    pub user_id: String,
    pub user_name: String,
    pub days: i32,
    pub minutes: i32,
    pub time_type: TimeType,
    pub status: CardStatus,
    /// Whether the card has ever been activated
    pub used: bool,
    /// Device bound at activation (set iff status is Used)
    pub seid: Option<String>,
    pub used_at: Option<i64>,
    pub locked_at: Option<i64>,
    pub deleted_at: Option<i64>,
    /// Set iff status is Used
    pub expired_at: Option<i64>,
    pub remark: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCard {
    /// Explicit card value; generated when absent
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub days: i32,
    #[serde(default)]
    pub minutes: i32,
    pub time_type: TimeType,
    #[serde(default)]
    pub remark: String,
}

/// Result of applying the Activate transition.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    /// Card moved from Unused to Used; must be persisted.
    Activated(Card),
    /// Card was already Used; returned unchanged.
    AlreadyActive(Card),
}

/// Expiry of a card activated at `activated_at`.
pub fn expiry_from(activated_at: i64, days: i32, minutes: i32) -> i64 {
    activated_at + days as i64 * SECONDS_PER_DAY + minutes as i64 * SECONDS_PER_MINUTE
}

impl Card {
    /// Unused -> Used, binding `seid`.
    pub fn activate(&self, seid: &str, now: i64) -> Result<ActivationOutcome> {
        match self.status {
            CardStatus::Used => Ok(ActivationOutcome::AlreadyActive(self.clone())),
            CardStatus::Locked | CardStatus::Deleted => Err(AppError::InvalidState(format!(
                "card is {}",
                self.status.as_ref()
            ))),
            CardStatus::Unused if seid.trim().is_empty() => {
                Err(AppError::InvalidParams("missing device id".into()))
            }
            CardStatus::Unused => Ok(ActivationOutcome::Activated(Card {
                status: CardStatus::Used,
                used: true,
                seid: Some(seid.to_string()),
                used_at: Some(now),
                expired_at: Some(expiry_from(now, self.days, self.minutes)),
                ..self.clone()
            })),
        }
    }

    /// Whether the device `seid` may use this card at `now`.
    pub fn is_usable_by(&self, seid: &str, now: i64) -> bool {
        self.status == CardStatus::Used
            && self.expired_at.is_some_and(|exp| exp > now)
            && self.seid.as_deref() == Some(seid)
    }

    /// Administrative lock. Unbinds the device.
    pub fn lock(&self, now: i64) -> Result<Card> {
        match self.status {
            CardStatus::Unused | CardStatus::Used => Ok(Card {
                status: CardStatus::Locked,
                locked_at: Some(now),
                seid: None,
                expired_at: None,
                ..self.clone()
            }),
            other => Err(AppError::InvalidState(format!(
                "cannot lock a card that is {}",
                other.as_ref()
            ))),
        }
    }

    /// Administrative delete. Terminal.
    pub fn delete(&self, now: i64) -> Result<Card> {
        if self.status == CardStatus::Deleted {
            return Err(AppError::InvalidState("card is already deleted".into()));
        }
        Ok(Card {
            status: CardStatus::Deleted,
            deleted_at: Some(now),
            seid: None,
            expired_at: None,
            ..self.clone()
        })
    }

    /// Administrative reset back to Unused, clearing every activation trace.
    pub fn reset(&self) -> Result<Card> {
        match self.status {
            CardStatus::Used | CardStatus::Locked => Ok(Card {
                status: CardStatus::Unused,
                used: false,
                seid: None,
                used_at: None,
                expired_at: None,
                locked_at: None,
                ..self.clone()
            }),
            other => Err(AppError::InvalidState(format!(
                "cannot reset a card that is {}",
                other.as_ref()
            ))),
        }
    }

    /// Override the expiry of an active card.
    pub fn extend(&self, new_expired_at: i64) -> Result<Card> {
        if self.status != CardStatus::Used {
            return Err(AppError::NoPermission("card is not activated".into()));
        }
        Ok(Card {
            expired_at: Some(new_expired_at),
            ..self.clone()
        })
    }
}

/// Generate a card value: `prefix` followed by `length` characters of A-Z0-9.
pub fn generate_card_value(prefix: &str, length: usize) -> String {
    let mut rng = OsRng;
    let body: String = (0..length)
        .map(|_| CARD_VALUE_CHARSET[rng.gen_range(0..CARD_VALUE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", prefix, body)
}
