//! Failure kinds raised by the identity service.

use thiserror::Error;

use crate::store::StoreError;

/// Structured errors for every identity operation.
///
/// Unknown-email and wrong-secret deliberately collapse into
/// [`IdentityError::InvalidCredentials`], and unknown and expired tokens
/// into [`IdentityError::InvalidOrExpiredToken`], so callers cannot infer
/// account existence from the error kind alone. `AccountNotFound` is only
/// used where enumeration is already moot (resend, and the token-without-
/// account inconsistency during verification).
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("an account with this email already exists")]
    AccountConflict,
    #[error("invalid email or secret")]
    InvalidCredentials,
    #[error("email address has not been verified")]
    EmailNotVerified,
    #[error("verification token is invalid or expired")]
    InvalidOrExpiredToken,
    #[error("account not found")]
    AccountNotFound,
    #[error("email address is already verified")]
    AlreadyVerified,
    #[error("store failure")]
    Store(#[from] StoreError),
    #[error("internal failure")]
    Internal(#[from] anyhow::Error),
}
