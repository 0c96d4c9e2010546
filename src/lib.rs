//! # Identeco (account & verification-token lifecycle core)
//!
//! `identeco` registers accounts, authenticates credential logins, and
//! gates access behind an email-verification step backed by single-use,
//! time-limited tokens. It is a library-level contract: no HTTP surface,
//! no session issuance, no outbound email — those belong to the boundary
//! layer that embeds it.
//!
//! ## Model
//!
//! - **Accounts** are keyed by normalized (lowercased, trimmed) email;
//!   exactly one account exists per normalized email, enforced at the
//!   storage layer. An account's `email_verified_at` timestamp is the
//!   sole login gate: `Unverified` transitions to `Verified` once, and
//!   `Verified` is terminal.
//! - **Verification tokens** carry 256 bits of OS randomness as 64 hex
//!   characters, live for 24 hours by default, and are single-use: a
//!   token is deleted on consumption and on first failed consumption
//!   after expiry. Resending invalidates every outstanding token for the
//!   address before issuing a fresh one.
//! - Cleartext secrets never persist; accounts leave the core only as
//!   [`AccountView`], which carries no credential material at all.
//!
//! ## Enumeration avoidance
//!
//! Unknown email, missing credential, and wrong secret all fail login
//! with one merged [`IdentityError::InvalidCredentials`] kind; unknown
//! and expired tokens merge into
//! [`IdentityError::InvalidOrExpiredToken`]. Error kinds never reveal
//! account existence where it has not already been proven.
//!
//! ## Storage
//!
//! The service is constructed with `Arc<dyn AccountStore>` and
//! `Arc<dyn VerificationTokenStore>` — never ambient globals. The crate
//! ships Postgres implementations and contract-faithful in-memory ones
//! for tests and embedding.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use identeco::{IdentityService, MemoryAccountStore, MemoryTokenStore};
//! use secrecy::SecretString;
//!
//! # async fn demo() -> Result<(), identeco::IdentityError> {
//! let service = IdentityService::new(
//!     Arc::new(MemoryAccountStore::new()),
//!     Arc::new(MemoryTokenStore::new()),
//! );
//!
//! let secret = SecretString::from("Sup3r$ecret".to_string());
//! let registration = service.register("a@example.com", "Alice", &secret).await?;
//! service.verify_email(&registration.verification_token.token).await?;
//! let account = service.login("A@Example.com", &secret).await?;
//! assert!(account.email_verified_at.is_some());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use error::IdentityError;
pub use models::{normalize_email, Account, AccountRole, AccountView, VerificationToken};
pub use service::{IdentityConfig, IdentityService, Registration};
pub use store::{
    AccountStore, MemoryAccountStore, MemoryTokenStore, PgAccountStore, PgTokenStore, StoreError,
    VerificationTokenStore,
};
