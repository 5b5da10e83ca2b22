//! Bearer-token resolution and re-issuance.
//!
//! Tokens are minted exactly once, inside the account-creation transaction.
//! This surface only resolves existing tokens and hands them back to
//! callers who can prove the password.

use crate::db::Account;
use crate::services::account_service::AccountError;

/// Domain service trait for bearer tokens.
#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Maps an opaque token to its owning account.
    ///
    /// Resolution does not consider `is_removed`; visibility of the account
    /// is a separate layer decided by the account service.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidToken`] if the token is unknown.
    async fn resolve(&self, token: &str) -> Result<Account, AccountError>;

    /// Returns the existing token for a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] if the credentials do
    /// not verify against a live account.
    async fn obtain(&self, username: &str, password: &str) -> Result<String, AccountError>;
}
