//! In-memory store implementations.
//!
//! Contract-faithful stand-ins for the Postgres stores: same conflict
//! signals, same case-insensitive email matching, same at-most-once
//! token deletion. Used by the test suite and usable for embedding where
//! durability is not required.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AccountStore, StoreError, VerificationTokenStore};
use crate::models::{Account, VerificationToken};

/// Account storage backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let duplicate = accounts.contains_key(&account.id)
            || accounts
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&account.email));
        if duplicate {
            return Err(StoreError::Conflict);
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts
            .values()
            .any(|account| account.email.eq_ignore_ascii_case(email)))
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get_mut(&id).map(|account| {
            account.email_verified_at = Some(verified_at);
            account.updated_at = verified_at;
            account.clone()
        }))
    }

    async fn update(&self, account: Account) -> Result<Option<Account>, StoreError> {
        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !accounts.contains_key(&account.id) {
            return Ok(None);
        }
        accounts.insert(account.id, account.clone());
        Ok(Some(account))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut accounts = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.remove(&id).is_some())
    }
}

/// Verification-token storage backed by a mutex-guarded map keyed by the
/// raw token value.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, VerificationToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding tokens held for an identifier.
    #[must_use]
    pub fn outstanding_for(&self, identifier: &str) -> usize {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens
            .values()
            .filter(|token| token.identifier == identifier)
            .count()
    }
}

#[async_trait]
impl VerificationTokenStore for MemoryTokenStore {
    async fn create(&self, token: VerificationToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(&token.token) {
            return Err(StoreError::Conflict);
        }
        tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationToken>, StoreError> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.get(token).cloned())
    }

    async fn find_by_identifier_and_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens
            .get(token)
            .filter(|record| record.identifier == identifier)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.remove(token).is_some())
    }

    async fn delete_all_for_identifier(&self, identifier: &str) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, record| record.identifier != identifier);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_all_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, record| now <= record.expires_at);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountRole;
    use chrono::Duration;

    fn account(email: &str) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: "Test".to_string(),
            credential_hash: None,
            email_verified_at: None,
            role: AccountRole::Member,
            created_at: now,
            updated_at: now,
        }
    }

    fn token(identifier: &str, value: &str, expires_at: DateTime<Utc>) -> VerificationToken {
        VerificationToken {
            identifier: identifier.to_string(),
            token: value.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn create_conflicts_on_same_email_ignoring_case() {
        let store = MemoryAccountStore::new();
        store.create(account("a@example.com")).await.expect("create");
        let result = store.create(account("A@Example.COM")).await;
        assert!(matches!(result, Err(StoreError::Conflict)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_by_email_matches_case_insensitively() {
        let store = MemoryAccountStore::new();
        store.create(account("a@example.com")).await.expect("create");
        let found = store.find_by_email("A@EXAMPLE.COM").await.expect("find");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn mark_email_verified_updates_both_timestamps() {
        let store = MemoryAccountStore::new();
        let created = store.create(account("a@example.com")).await.expect("create");
        let at = Utc::now() + Duration::seconds(5);
        let updated = store
            .mark_email_verified(created.id, at)
            .await
            .expect("mark")
            .expect("account exists");
        assert_eq!(updated.email_verified_at, Some(at));
        assert_eq!(updated.updated_at, at);
    }

    #[tokio::test]
    async fn delete_by_token_reports_at_most_once() {
        let store = MemoryTokenStore::new();
        let expires = Utc::now() + Duration::hours(24);
        store
            .create(token("a@example.com", "t1", expires))
            .await
            .expect("create");
        assert!(store.delete_by_token("t1").await.expect("first delete"));
        assert!(!store.delete_by_token("t1").await.expect("second delete"));
    }

    #[tokio::test]
    async fn duplicate_token_value_conflicts() {
        let store = MemoryTokenStore::new();
        let expires = Utc::now() + Duration::hours(24);
        store
            .create(token("a@example.com", "t1", expires))
            .await
            .expect("create");
        let result = store.create(token("b@example.com", "t1", expires)).await;
        assert!(matches!(result, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn delete_all_expired_keeps_live_tokens() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store
            .create(token("a@example.com", "dead", now - Duration::hours(1)))
            .await
            .expect("create");
        store
            .create(token("a@example.com", "live", now + Duration::hours(1)))
            .await
            .expect("create");
        let removed = store.delete_all_expired(now).await.expect("sweep");
        assert_eq!(removed, 1);
        assert_eq!(store.outstanding_for("a@example.com"), 1);
        assert!(store.find_by_token("live").await.expect("find").is_some());
    }

    #[tokio::test]
    async fn delete_all_for_identifier_counts_removals() {
        let store = MemoryTokenStore::new();
        let expires = Utc::now() + Duration::hours(24);
        store
            .create(token("a@example.com", "t1", expires))
            .await
            .expect("create");
        store
            .create(token("a@example.com", "t2", expires))
            .await
            .expect("create");
        store
            .create(token("b@example.com", "t3", expires))
            .await
            .expect("create");
        let removed = store
            .delete_all_for_identifier("a@example.com")
            .await
            .expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(store.outstanding_for("b@example.com"), 1);
    }
}
