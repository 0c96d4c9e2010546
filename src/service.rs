//! The identity service: registration, credential login, email
//! verification, and resend-with-invalidation over injected stores.

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::IdentityError;
use crate::models::{normalize_email, Account, AccountRole, AccountView, VerificationToken};
use crate::password;
use crate::store::{AccountStore, StoreError, VerificationTokenStore};
use crate::token;

/// Tunables for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Lifetime of issued verification tokens, in hours.
    pub token_ttl_hours: i64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: token::DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// Result of a successful registration.
///
/// The raw token leaves the core exactly here, for delivery by an
/// email-sending collaborator; it is never retrievable again.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: AccountView,
    pub verification_token: VerificationToken,
}

/// Orchestrates the account and verification-token lifecycle.
///
/// Stateless between calls; all durable state lives in the injected
/// stores. Every operation follows the same shape: validate, check the
/// invariant, mutate, return or fail with a typed [`IdentityError`].
#[derive(Clone)]
pub struct IdentityService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<dyn VerificationTokenStore>,
    config: IdentityConfig,
}

impl IdentityService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, tokens: Arc<dyn VerificationTokenStore>) -> Self {
        Self::with_config(accounts, tokens, IdentityConfig::default())
    }

    #[must_use]
    pub fn with_config(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn VerificationTokenStore>,
        config: IdentityConfig,
    ) -> Self {
        Self {
            accounts,
            tokens,
            config,
        }
    }

    /// Register a new account and issue its verification token.
    ///
    /// The account starts unverified. The existence pre-check gives a
    /// friendly error; the store's own conflict signal is what actually
    /// holds under concurrent registration.
    ///
    /// # Errors
    /// `AccountConflict` if the normalized email is already registered.
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        secret: &SecretString,
    ) -> Result<Registration, IdentityError> {
        let email = normalize_email(email);
        if self.accounts.exists_by_email(&email).await? {
            return Err(IdentityError::AccountConflict);
        }

        let credential_hash = password::hash_password(secret)?;
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.clone(),
            display_name: display_name.to_string(),
            credential_hash: Some(credential_hash),
            email_verified_at: None,
            role: AccountRole::default(),
            created_at: now,
            updated_at: now,
        };
        let account = match self.accounts.create(account).await {
            Ok(account) => account,
            Err(StoreError::Conflict) => return Err(IdentityError::AccountConflict),
            Err(err) => return Err(err.into()),
        };

        let verification_token = self.issue_token(&email).await?;
        info!(account_id = %account.id, "registered new account");
        Ok(Registration {
            account: account.into(),
            verification_token,
        })
    }

    /// Authenticate a credential login.
    ///
    /// No session is created; session establishment belongs to the caller.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email, an account with no
    /// credential set, or a wrong secret — indistinguishable by design.
    /// `EmailNotVerified` once the credential has been proven correct but
    /// verification is still pending.
    pub async fn login(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<AccountView, IdentityError> {
        let email = normalize_email(email);
        let Some(account) = self.accounts.find_by_email(&email).await? else {
            return Err(IdentityError::InvalidCredentials);
        };
        let Some(hash) = account.credential_hash.as_deref() else {
            return Err(IdentityError::InvalidCredentials);
        };
        if !password::verify_password(secret, hash)? {
            return Err(IdentityError::InvalidCredentials);
        }
        if !account.is_verified() {
            return Err(IdentityError::EmailNotVerified);
        }
        debug!(account_id = %account.id, "credential login succeeded");
        Ok(account.into())
    }

    /// Consume a verification token and mark its account verified.
    ///
    /// Expired tokens are garbage-collected here, on their first failed
    /// consumption. The token row is claimed before the account is
    /// touched: of two concurrent consumers, exactly one wins the delete
    /// and the other observes the token already gone.
    ///
    /// # Errors
    /// `InvalidOrExpiredToken` for an unknown, expired, or concurrently
    /// consumed token. `AccountNotFound` if the token outlived its
    /// account.
    pub async fn verify_email(&self, raw_token: &str) -> Result<AccountView, IdentityError> {
        let Some(record) = self.tokens.find_by_token(raw_token).await? else {
            return Err(IdentityError::InvalidOrExpiredToken);
        };
        if token::is_expired(record.expires_at) {
            self.tokens.delete_by_token(raw_token).await?;
            debug!(identifier = %record.identifier, "discarded expired verification token");
            return Err(IdentityError::InvalidOrExpiredToken);
        }

        let Some(account) = self.accounts.find_by_email(&record.identifier).await? else {
            return Err(IdentityError::AccountNotFound);
        };
        if !self.tokens.delete_by_token(raw_token).await? {
            return Err(IdentityError::InvalidOrExpiredToken);
        }

        let verified = self
            .accounts
            .mark_email_verified(account.id, Utc::now())
            .await?
            .ok_or(IdentityError::AccountNotFound)?;
        info!(account_id = %verified.id, "email verified");
        Ok(verified.into())
    }

    /// Invalidate any outstanding tokens for an unverified account and
    /// issue a fresh one, so previously-sent links become unusable at
    /// once. At most one live token per identifier remains afterwards.
    ///
    /// # Errors
    /// `AccountNotFound` for an unknown email, `AlreadyVerified` once the
    /// account has left the unverified state.
    pub async fn resend_verification(
        &self,
        email: &str,
    ) -> Result<VerificationToken, IdentityError> {
        let email = normalize_email(email);
        let Some(account) = self.accounts.find_by_email(&email).await? else {
            return Err(IdentityError::AccountNotFound);
        };
        if account.is_verified() {
            return Err(IdentityError::AlreadyVerified);
        }

        let invalidated = self.tokens.delete_all_for_identifier(&email).await?;
        let verification_token = self.issue_token(&email).await?;
        info!(
            account_id = %account.id,
            invalidated,
            "reissued verification token"
        );
        Ok(verification_token)
    }

    /// Read-only lookup for the boundary layer.
    ///
    /// # Errors
    /// Only store failures; an unknown id is `None`.
    pub async fn account_by_id(&self, id: Uuid) -> Result<Option<AccountView>, IdentityError> {
        let account = self.accounts.find_by_id(id).await?;
        Ok(account.map(AccountView::from))
    }

    /// Read-only lookup by email, normalized before the store is asked.
    ///
    /// # Errors
    /// Only store failures; an unknown email is `None`.
    pub async fn account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountView>, IdentityError> {
        let email = normalize_email(email);
        let account = self.accounts.find_by_email(&email).await?;
        Ok(account.map(AccountView::from))
    }

    /// Bulk sweep of expired tokens. Not scheduled by this core; wire it
    /// to a timer or cron in the embedding process if lazy cleanup is not
    /// enough.
    ///
    /// # Errors
    /// Only store failures.
    pub async fn purge_expired_tokens(&self) -> Result<u64, IdentityError> {
        let removed = self.tokens.delete_all_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "purged expired verification tokens");
        }
        Ok(removed)
    }

    async fn issue_token(&self, identifier: &str) -> Result<VerificationToken, IdentityError> {
        let verification_token = VerificationToken {
            identifier: identifier.to_string(),
            token: token::generate_token()?,
            expires_at: token::expiry_from_now(self.config.token_ttl_hours),
        };
        self.tokens.create(verification_token.clone()).await?;
        Ok(verification_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_issues_24_hour_tokens() {
        assert_eq!(IdentityConfig::default().token_ttl_hours, 24);
    }
}
