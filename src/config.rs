use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::crypto::{EnvelopeKey, SigningKeys};
use crate::rate_limit::{DEFAULT_RELAXED_RPM, DEFAULT_STANDARD_RPM, RateLimitConfig};
use crate::replay::DEFAULT_WINDOW_SECS;
use crate::signal::ThrottlePolicy;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub ledger_database_path: String,
    pub dev_mode: bool,
    pub envelope_key: EnvelopeKey,
    pub signing_keys: SigningKeys,
    pub replay_window_secs: i64,
    pub cache_ttl: Duration,
    pub throttle: ThrottlePolicy,
    pub request_timeout: Duration,
    pub rate_limit: RateLimitConfig,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a key from `{name}_FILE` if set, else from `{name}`.
fn key_material(name: &str) -> Result<Option<String>, String> {
    if let Ok(path) = env::var(format!("{}_FILE", name)) {
        return std::fs::read_to_string(&path)
            .map(|s| Some(s.trim().to_string()))
            .map_err(|e| format!("Failed to read {}_FILE ({}): {}", name, path, e));
    }
    Ok(env::var(name).ok().filter(|s| !s.trim().is_empty()))
}

fn load_envelope_key(dev_mode: bool) -> Result<EnvelopeKey, String> {
    match key_material("CARDGATE_ENVELOPE_KEY")? {
        Some(encoded) => EnvelopeKey::from_base64(&encoded).map_err(|e| e.to_string()),
        None if dev_mode => {
            tracing::warn!("CARDGATE_ENVELOPE_KEY not set, using an ephemeral dev key");
            EnvelopeKey::from_base64(&EnvelopeKey::generate()).map_err(|e| e.to_string())
        }
        None => Err(
            "CARDGATE_ENVELOPE_KEY or CARDGATE_ENVELOPE_KEY_FILE must be set (run with --generate-keys)"
                .to_string(),
        ),
    }
}

fn load_signing_keys(dev_mode: bool) -> Result<SigningKeys, String> {
    let keys = match key_material("CARDGATE_SIGNING_KEY")? {
        Some(encoded) => SigningKeys::from_base64(&encoded).map_err(|e| e.to_string())?,
        None if dev_mode => {
            tracing::warn!("CARDGATE_SIGNING_KEY not set, using an ephemeral dev key");
            let (secret, _) = SigningKeys::generate_keypair();
            SigningKeys::from_base64(&secret).map_err(|e| e.to_string())?
        }
        None => {
            return Err(
                "CARDGATE_SIGNING_KEY or CARDGATE_SIGNING_KEY_FILE must be set (run with --generate-keys)"
                    .to_string(),
            );
        }
    };

    match env::var("CARDGATE_CLIENT_PUBLIC_KEY") {
        Ok(client) if !client.trim().is_empty() => {
            keys.with_client_key(&client).map_err(|e| e.to_string())
        }
        _ => Ok(keys),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CARDGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env_or("PORT", 3000);

        let throttle_defaults = ThrottlePolicy::default();

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "cardgate.db".to_string()),
            ledger_database_path: env::var("LEDGER_DATABASE_PATH")
                .unwrap_or_else(|_| "cardgate_ledger.db".to_string()),
            dev_mode,
            envelope_key: load_envelope_key(dev_mode)?,
            signing_keys: load_signing_keys(dev_mode)?,
            replay_window_secs: env_or("REPLAY_WINDOW_SECS", DEFAULT_WINDOW_SECS),
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", 300)),
            throttle: ThrottlePolicy {
                hourly_limit: env_or("THROTTLE_HOURLY_LIMIT", throttle_defaults.hourly_limit),
                total_limit: env_or("THROTTLE_TOTAL_LIMIT", throttle_defaults.total_limit),
            },
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 30)),
            rate_limit: RateLimitConfig {
                standard_rpm: env_or("RATE_LIMIT_STANDARD_RPM", DEFAULT_STANDARD_RPM),
                relaxed_rpm: env_or("RATE_LIMIT_RELAXED_RPM", DEFAULT_RELAXED_RPM),
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
