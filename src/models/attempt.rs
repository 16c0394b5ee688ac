use serde::{Deserialize, Serialize};

/// One inbound activation request, as recorded in the attempt ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationAttempt {
    pub id: i64,
    pub card_value: String,
    pub activation_at: i64,
    pub success: bool,
    pub error_message: Option<String>,
    /// Decrypted request payload snapshot (JSON)
    pub request_data: Option<String>,
    /// Response payload snapshot (JSON or error text)
    pub response_data: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreateActivationAttempt {
    pub card_value: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub request_data: Option<String>,
    pub response_data: Option<String>,
}

/// Attempt totals for one card value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounts {
    pub total: i64,
    pub last_hour: i64,
}
