//! Account and verification-token data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Role attached to an account at creation.
///
/// Accounts start as [`AccountRole::Member`]; this core never mutates the
/// role afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    #[default]
    Member,
    Admin,
}

impl AccountRole {
    /// Textual form persisted by the stores.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

/// A registered identity as persisted by an account store.
///
/// `credential_hash` holds the argon2 PHC string, never the cleartext
/// secret. `None` is legal: such an account exists but can never pass a
/// credential login. `email_verified_at` is the sole login gate; `None`
/// means unverified.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub credential_hash: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Sanitized account representation returned to callers outside the store
/// layer. Carries no credential material at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            email_verified_at: account.email_verified_at,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

/// A single-use, time-limited token proving control of an email address.
///
/// `identifier` is the normalized email the token authenticates, a loose
/// reference rather than a foreign key. Tokens are immutable until
/// deleted, either on consumption or on detected expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn role_defaults_to_member() {
        assert_eq!(AccountRole::default(), AccountRole::Member);
        assert_eq!(AccountRole::default().as_str(), "member");
    }

    #[test]
    fn view_strips_credential_hash() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            display_name: "Alice".to_string(),
            credential_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string()),
            email_verified_at: None,
            role: AccountRole::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = AccountView::from(account);
        let json = serde_json::to_value(&view).expect("serialize view");
        let object = json.as_object().expect("view serializes to an object");
        assert!(!object.contains_key("credential_hash"));
        assert_eq!(object["email"], "a@example.com");
    }
}
