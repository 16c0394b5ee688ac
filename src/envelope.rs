//! Wire envelope for the activation endpoints.
//!
//! Requests: `{data, signature, timestamp}` where `data` is the encrypted JSON
//! body and `signature` covers `timestamp || data`.
//! Responses: `{rs, x, s}` where `rs` is the encrypted result, `x` the abuse
//! signal and `s` a signature over `rs || x`.

use serde::{Deserialize, Serialize};

use crate::crypto::{EnvelopeKey, SigningKeys};
use crate::error::{AppError, Result};
use crate::replay::ReplayGuard;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    pub data: String,
    pub signature: String,
    pub timestamp: String,
}

/// Decrypted request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRequest {
    pub value: String,
    /// Device id; not needed by the signal endpoint
    #[serde(default)]
    pub seid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedResponse {
    pub rs: String,
    pub x: String,
    pub s: String,
}

fn request_signing_input(timestamp: &str, data: &str) -> String {
    format!("{}{}", timestamp, data)
}

impl SignedRequest {
    /// Build a request the way a client does. Used by tooling and tests.
    pub fn seal(
        envelope: &EnvelopeKey,
        client: &SigningKeys,
        body: &CardRequest,
        timestamp: &str,
    ) -> Result<Self> {
        let data = envelope.encrypt(&serde_json::to_vec(body)?)?;
        let signature = client.sign(request_signing_input(timestamp, &data).as_bytes());
        Ok(Self {
            data,
            signature,
            timestamp: timestamp.to_string(),
        })
    }

    /// Check freshness, then the signature, then decrypt.
    ///
    /// Nothing is known about the card until decryption succeeds, so failures
    /// here are only logged.
    pub fn open(
        &self,
        replay: &ReplayGuard,
        signing: &SigningKeys,
        envelope: &EnvelopeKey,
    ) -> Result<CardRequest> {
        if !replay.is_fresh(&self.timestamp) {
            tracing::warn!(timestamp = %self.timestamp, "Rejected request outside replay window");
            return Err(AppError::InvalidParams("invalid timestamp".into()));
        }

        let input = request_signing_input(&self.timestamp, &self.data);
        if !signing.verify_request(input.as_bytes(), &self.signature) {
            tracing::warn!("Rejected request with invalid signature");
            return Err(AppError::InvalidParams("invalid signature".into()));
        }

        let plaintext = envelope.decrypt(&self.data).inspect_err(|_| {
            tracing::warn!("Rejected request with undecryptable body");
        })?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| AppError::InvalidParams(format!("malformed request body: {}", e)))
    }
}

impl SealedResponse {
    pub fn seal(
        envelope: &EnvelopeKey,
        signing: &SigningKeys,
        result: &str,
        x: String,
    ) -> Result<Self> {
        let rs = envelope.encrypt(result.as_bytes())?;
        let s = signing.sign(format!("{}{}", rs, x).as_bytes());
        Ok(Self { rs, x, s })
    }

    /// Client-side check that `rs` and `x` came from the server untouched.
    pub fn verify(&self, signing: &SigningKeys) -> bool {
        signing.verify(format!("{}{}", self.rs, self.x).as_bytes(), &self.s)
    }

    /// Client-side decryption of the result.
    pub fn open(&self, envelope: &EnvelopeKey) -> Result<String> {
        let plaintext = envelope.decrypt(&self.rs)?;
        String::from_utf8(plaintext)
            .map_err(|_| AppError::InvalidParams("result is not utf-8".into()))
    }
}
