//! One-way credential hashing built on argon2id.
//!
//! Purely CPU-bound; no storage or network access. Hashing dominates
//! register/login latency by construction of the algorithm's cost factor.

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};

/// Hash a secret with a per-call random salt, producing a PHC string.
///
/// # Errors
/// Returns an error only on unrecoverable hashing failure; any well-formed
/// non-empty input hashes successfully.
pub fn hash_password(secret: &SecretString) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.expose_secret().as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash credential: {err}"))?;
    Ok(hash.to_string())
}

/// Check whether `secret` would have produced `hash`.
///
/// The comparison is argon2's constant-time verification; timing does not
/// reveal where a mismatch occurs.
///
/// # Errors
/// A stored hash that fails to parse is an infrastructure fault and
/// surfaces as an error, never as `false`.
pub fn verify_password(secret: &SecretString, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| anyhow!("malformed credential hash: {err}"))?;
    match Argon2::default().verify_password(secret.expose_secret().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("failed to verify credential: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password(&secret("Sup3r$ecret")).expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert_eq!(verify_password(&secret("Sup3r$ecret"), &hash).ok(), Some(true));
    }

    #[test]
    fn wrong_secret_does_not_verify() {
        let hash = hash_password(&secret("Sup3r$ecret")).expect("hash");
        assert_eq!(verify_password(&secret("wrong"), &hash).ok(), Some(false));
    }

    #[test]
    fn salt_is_random_per_call() {
        let first = hash_password(&secret("Sup3r$ecret")).expect("hash");
        let second = hash_password(&secret("Sup3r$ecret")).expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password(&secret("anything"), "not-a-phc-string").is_err());
    }
}
