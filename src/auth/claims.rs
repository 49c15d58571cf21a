//! Access token claims
//!
//! Reads the expiry out of a JWT payload without verifying its signature.
//! Only useful for deciding whether a token is worth sending; the backend
//! remains the authority.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Window before expiry in which a token counts as expiring soon.
pub const EXPIRING_SOON: Duration = Duration::from_secs(5 * 60);

/// Decodes the payload segment of a JWT.
pub fn parse_claims(token: &str) -> Option<Map<String, Value>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The `exp` claim as a timestamp.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = parse_claims(token)?.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// A token without a readable `exp` is treated as expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    expires_at(token).map_or(true, |exp| exp < now)
}

/// True when the token expires within [`EXPIRING_SOON`], or has no readable `exp`.
pub fn is_expiring_soon(token: &str) -> bool {
    remaining_at(token, Utc::now()) < EXPIRING_SOON
}

/// Time left before expiry, zero when expired or unreadable.
pub fn remaining(token: &str) -> Duration {
    remaining_at(token, Utc::now())
}

pub fn remaining_at(token: &str, now: DateTime<Utc>) -> Duration {
    expires_at(token)
        .and_then(|exp| (exp - now).to_std().ok())
        .unwrap_or(Duration::ZERO)
}
