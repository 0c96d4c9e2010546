//! Postgres-backed store implementations.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE accounts (
//!     id                UUID PRIMARY KEY,
//!     email             TEXT NOT NULL,
//!     display_name      TEXT NOT NULL,
//!     credential_hash   TEXT,
//!     email_verified_at TIMESTAMPTZ,
//!     role              TEXT NOT NULL DEFAULT 'member',
//!     created_at        TIMESTAMPTZ NOT NULL,
//!     updated_at        TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX accounts_email_key ON accounts (LOWER(email));
//!
//! CREATE TABLE verification_tokens (
//!     identifier TEXT NOT NULL,
//!     token      TEXT NOT NULL UNIQUE,
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (identifier, token)
//! );
//! ```
//!
//! The unique index on `LOWER(email)` is the storage-layer safety net for
//! the one-account-per-email invariant; `create` maps its violation to
//! [`StoreError::Conflict`].

use anyhow::{Context, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{AccountStore, StoreError, VerificationTokenStore};
use crate::models::{Account, AccountRole, VerificationToken};

/// SQLSTATE 23505, Postgres' unique-constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn db_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn role_from_db(value: &str) -> Result<AccountRole, sqlx::Error> {
    match value {
        "member" => Ok(AccountRole::Member),
        "admin" => Ok(AccountRole::Admin),
        _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid accounts.role value: {value}"),
        )))),
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        credential_hash: row.try_get("credential_hash")?,
        email_verified_at: row.try_get("email_verified_at")?,
        role: role_from_db(&role)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn token_from_row(row: &PgRow) -> Result<VerificationToken, sqlx::Error> {
    Ok(VerificationToken {
        identifier: row.try_get("identifier")?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn decode_account(row: Option<PgRow>) -> Result<Option<Account>, StoreError> {
    row.map(|row| account_from_row(&row))
        .transpose()
        .map_err(|err| StoreError::Backend(Error::new(err).context("failed to decode account row")))
}

const ACCOUNT_COLUMNS: &str =
    "id, email, display_name, credential_hash, email_verified_at, role, created_at, updated_at";

/// Account storage over a Postgres pool.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let query = r"
            INSERT INTO accounts
                (id, email, display_name, credential_hash, email_verified_at, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(&account.credential_hash)
            .bind(account.email_verified_at)
            .bind(account.role.as_str())
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;
        match result {
            Ok(_) => Ok(account),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Backend(
                Error::new(err).context("failed to insert account"),
            )),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup account by id")?;
        decode_account(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE LOWER(email) = LOWER($1)");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup account by email")?;
        decode_account(row)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let query = "SELECT 1 FROM accounts WHERE LOWER(email) = LOWER($1) LIMIT 1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to check account existence")?;
        Ok(row.is_some())
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            r"
            UPDATE accounts
            SET email_verified_at = $2,
                updated_at = $2
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
        "
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(verified_at)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await
            .context("failed to mark email verified")?;
        decode_account(row)
    }

    async fn update(&self, account: Account) -> Result<Option<Account>, StoreError> {
        let query = format!(
            r"
            UPDATE accounts
            SET email = $2,
                display_name = $3,
                credential_hash = $4,
                email_verified_at = $5,
                role = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
        "
        );
        let row = sqlx::query(&query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(&account.credential_hash)
            .bind(account.email_verified_at)
            .bind(account.role.as_str())
            .bind(account.updated_at)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await
            .context("failed to update account")?;
        decode_account(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM accounts WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }
}

/// Verification-token storage over a Postgres pool.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationTokenStore for PgTokenStore {
    async fn create(&self, token: VerificationToken) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO verification_tokens (identifier, token, expires_at)
            VALUES ($1, $2, $3)
        ";
        let result = sqlx::query(query)
            .bind(&token.identifier)
            .bind(&token.token)
            .bind(token.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Backend(
                Error::new(err).context("failed to insert verification token"),
            )),
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationToken>, StoreError> {
        let query = "SELECT identifier, token, expires_at FROM verification_tokens WHERE token = $1";
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup verification token")?;
        row.map(|row| token_from_row(&row)).transpose().map_err(|err| {
            StoreError::Backend(Error::new(err).context("failed to decode verification token row"))
        })
    }

    async fn find_by_identifier_and_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        let query = r"
            SELECT identifier, token, expires_at
            FROM verification_tokens
            WHERE identifier = $1 AND token = $2
        ";
        let row = sqlx::query(query)
            .bind(identifier)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup verification token by identifier")?;
        row.map(|row| token_from_row(&row)).transpose().map_err(|err| {
            StoreError::Backend(Error::new(err).context("failed to decode verification token row"))
        })
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let query = "DELETE FROM verification_tokens WHERE token = $1";
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete verification token")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_identifier(&self, identifier: &str) -> Result<u64, StoreError> {
        let query = "DELETE FROM verification_tokens WHERE identifier = $1";
        let result = sqlx::query(query)
            .bind(identifier)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete verification tokens for identifier")?;
        Ok(result.rows_affected())
    }

    async fn delete_all_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let query = "DELETE FROM verification_tokens WHERE expires_at < $1";
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to sweep expired verification tokens")?;
        Ok(result.rows_affected())
    }
}
