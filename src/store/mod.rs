//! Storage contracts for accounts and verification tokens.
//!
//! Stores are mechanical: they persist what they are told and enforce no
//! business rules beyond their uniqueness constraints. All lifecycle
//! policy lives in [`crate::service::IdentityService`], which takes store
//! implementations by injection so tests can substitute the in-memory
//! ones.

mod memory;
mod postgres;

pub use memory::{MemoryAccountStore, MemoryTokenStore};
pub use postgres::{PgAccountStore, PgTokenStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, VerificationToken};

/// Failures surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated, by a duplicate or by a
    /// concurrent write that won the race.
    #[error("unique constraint violated")]
    Conflict,
    /// Anything infrastructural: connectivity, corrupt rows, backend
    /// faults.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Durable keyed storage for accounts.
///
/// `create` must itself report [`StoreError::Conflict`] when the
/// normalized-email uniqueness constraint is violated; a caller's own
/// existence pre-check is advisory only and is not the safety net under
/// concurrency.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new account exactly as given.
    async fn create(&self, account: Account) -> Result<Account, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Look up by email. Input is expected normalized; matching is
    /// case-insensitive at the storage layer regardless.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    /// Set the verification timestamp (and `updated_at`), returning the
    /// updated account if it exists.
    async fn mark_email_verified(
        &self,
        id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;

    /// Replace a stored account wholesale, returning the updated row if it
    /// exists.
    async fn update(&self, account: Account) -> Result<Option<Account>, StoreError>;

    /// Returns whether an account was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Durable keyed storage for outstanding verification tokens.
#[async_trait]
pub trait VerificationTokenStore: Send + Sync {
    /// Persist a token. A duplicate `(identifier, token)` pair, or a
    /// duplicate token value, is a [`StoreError::Conflict`].
    async fn create(&self, token: VerificationToken) -> Result<(), StoreError>;

    /// Look up by raw token value alone; tokens are globally unique.
    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationToken>, StoreError>;

    async fn find_by_identifier_and_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, StoreError>;

    /// Delete by raw token value. Returns whether a row was removed; under
    /// concurrent consumption exactly one caller observes `true`.
    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Remove every outstanding token for an identifier, returning the
    /// count removed.
    async fn delete_all_for_identifier(&self, identifier: &str) -> Result<u64, StoreError>;

    /// Maintenance sweep: remove all tokens expired as of `now`, returning
    /// the count removed.
    async fn delete_all_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
