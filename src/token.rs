//! Verification-token generation and expiry policy.
//!
//! Stateless apart from the system clock and the OS random source.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy behind each token; hex-encoded to twice as many
/// characters.
pub const TOKEN_BYTES: usize = 32;

/// Default token lifetime in hours.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Create a new opaque verification token: 256 bits from the OS random
/// source, hex-encoded. Uniqueness rests on this entropy alone.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    Ok(hex::encode(bytes))
}

/// Expiry timestamp `hours` from the current time.
#[must_use]
pub fn expiry_from_now(hours: i64) -> DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}

/// Whether the expiry lies strictly in the past.
#[must_use]
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    is_expired_at(expires_at, Utc::now())
}

/// Clock-injected form of [`is_expired`].
#[must_use]
pub fn is_expired_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}
