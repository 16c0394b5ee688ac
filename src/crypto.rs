//! Message-level cryptography for the activation protocol.
//!
//! Two independent keys are involved:
//!
//! - [`EnvelopeKey`]: a pre-shared AES-256-GCM key known to the server and to
//!   client builds. Request bodies arrive encrypted with it and response
//!   results leave encrypted with it.
//!   Wire format: base64(nonce (12 bytes) || ciphertext || tag)
//! - [`SigningKeys`]: the server's Ed25519 key pair. Signatures are computed
//!   over the SHA-256 digest of the signed string and base64-encoded.
//!
//! Both are loaded once at startup and shared read-only afterwards.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Nonce size for AES-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Envelope key size (256 bits for AES-256)
const ENVELOPE_KEY_SIZE: usize = 32;

/// GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Ed25519 secret and public key size
const ED25519_KEY_SIZE: usize = 32;

/// Pre-shared symmetric key for request/response bodies.
#[derive(Clone)]
pub struct EnvelopeKey {
    key: [u8; ENVELOPE_KEY_SIZE],
}

impl EnvelopeKey {
    /// Create an EnvelopeKey from a base64-encoded string.
    /// The decoded key must be exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::Internal(format!("Invalid envelope key encoding: {}", e)))?;

        if decoded.len() != ENVELOPE_KEY_SIZE {
            return Err(AppError::Internal(format!(
                "Envelope key must be {} bytes, got {}",
                ENVELOPE_KEY_SIZE,
                decoded.len()
            )));
        }

        let mut key = [0u8; ENVELOPE_KEY_SIZE];
        key.copy_from_slice(&decoded);
        Ok(Self { key })
    }

    pub fn from_bytes(key: [u8; ENVELOPE_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Generate a new random envelope key, base64-encoded.
    pub fn generate() -> String {
        let mut key = [0u8; ENVELOPE_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(format!("Failed to create cipher: {}", e)))
    }

    /// Encrypt a plaintext for the wire. Every call uses a fresh random nonce,
    /// so equal plaintexts never produce equal ciphertexts.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| AppError::Internal(format!("Encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a base64 wire ciphertext.
    ///
    /// The input is attacker-controlled, so every failure is reported as
    /// `InvalidParams` rather than a server fault.
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|_| AppError::InvalidParams("undecryptable body".into()))?;

        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(AppError::InvalidParams("undecryptable body".into()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AppError::InvalidParams("undecryptable body".into()))
    }
}

/// The server's signing key, plus the key inbound request signatures are
/// checked against.
///
/// Unless a dedicated client key is configured, requests are verified against
/// the server's own public key.
#[derive(Clone)]
pub struct SigningKeys {
    signing: SigningKey,
    request_key: VerifyingKey,
}

impl SigningKeys {
    /// Build from a base64-encoded 32-byte Ed25519 secret key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = decode_key(encoded, "signing key")?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(secret: [u8; ED25519_KEY_SIZE]) -> Self {
        let signing = SigningKey::from_bytes(&secret);
        let request_key = signing.verifying_key();
        Self {
            signing,
            request_key,
        }
    }

    /// Verify inbound requests against a separate client public key.
    pub fn with_client_key(mut self, public_b64: &str) -> Result<Self> {
        let bytes = decode_key(public_b64, "client public key")?;
        self.request_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| AppError::Internal(format!("Invalid client public key: {}", e)))?;
        Ok(self)
    }

    /// Generate a new Ed25519 key pair.
    /// Returns (secret_key_base64, public_key_base64)
    pub fn generate_keypair() -> (String, String) {
        let signing_key = SigningKey::generate(&mut OsRng);
        (
            BASE64.encode(signing_key.to_bytes()),
            BASE64.encode(signing_key.verifying_key().to_bytes()),
        )
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.signing.verifying_key().to_bytes())
    }

    /// Sign `data`: SHA-256 digest, Ed25519 signature, base64.
    pub fn sign(&self, data: &[u8]) -> String {
        let signature = self.signing.sign(&digest(data));
        BASE64.encode(signature.to_bytes())
    }

    /// Verify a signature produced by [`SigningKeys::sign`] against the
    /// server's public key.
    pub fn verify(&self, data: &[u8], signature: &str) -> bool {
        verify_with(&self.signing.verifying_key(), data, signature)
    }

    /// Verify an inbound request signature.
    pub fn verify_request(&self, data: &[u8], signature: &str) -> bool {
        verify_with(&self.request_key, data, signature)
    }
}

fn digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn verify_with(key: &VerifyingKey, data: &[u8], signature: &str) -> bool {
    let Ok(bytes) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(&digest(data), &signature).is_ok()
}

fn decode_key(encoded: &str, what: &str) -> Result<[u8; ED25519_KEY_SIZE]> {
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| AppError::Internal(format!("Invalid {} encoding: {}", what, e)))?;
    decoded.try_into().map_err(|v: Vec<u8>| {
        AppError::Internal(format!(
            "{} must be {} bytes, got {}",
            what,
            ED25519_KEY_SIZE,
            v.len()
        ))
    })
}
