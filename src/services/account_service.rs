//! Domain service for the account lifecycle.
//!
//! Handles registration, profile retrieval/update, password changes, and
//! soft deletion. Every mutating operation takes the resolved acting
//! account as an explicit parameter; nothing is read from ambient request
//! state.

use thiserror::Error;

use crate::db::{Account, RegisteredAccount};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("Account not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Input for registration. Privilege flags and identifiers are absent by
/// construction: callers cannot supply them through any path.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Mutable fields for the generic profile-update path. A `password` value
/// is carried so the wire format can accept the key, but it never reaches
/// storage; the authenticatable password only changes via `change_password`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Domain service trait for the account lifecycle.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Registers a new account and issues its bearer token atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for missing username/password or
    /// a malformed email, [`AccountError::DuplicateUsername`] if the name is
    /// taken by any account, removed or not.
    async fn register(&self, new_account: NewAccount) -> Result<RegisteredAccount, AccountError>;

    /// Fetches a live account by its public id.
    async fn get_profile(&self, public_id: &str) -> Result<Account, AccountError>;

    /// Administrative view of every account, soft-deleted included.
    async fn list_accounts(&self) -> Result<Vec<Account>, AccountError>;

    /// Updates profile fields. Only the account itself may mutate.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] for absent or removed targets and
    /// [`AccountError::Forbidden`] when the actor is not the target.
    async fn update_profile(
        &self,
        public_id: &str,
        actor: Option<&Account>,
        update: ProfileUpdate,
    ) -> Result<Account, AccountError>;

    /// Changes the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] if the old password does
    /// not verify; the stored hash is left untouched in that case.
    async fn change_password(
        &self,
        public_id: &str,
        actor: Option<&Account>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError>;

    /// Soft-deletes the account. Only the account itself may delete.
    async fn delete(&self, public_id: &str, actor: Option<&Account>) -> Result<(), AccountError>;
}
