//! `SeaORM` implementation of the `TokenService` trait.

use async_trait::async_trait;

use crate::db::{Account, Store};
use crate::services::account_service::AccountError;
use crate::services::token_service::TokenService;

pub struct SeaOrmTokenService {
    store: Store,
}

impl SeaOrmTokenService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TokenService for SeaOrmTokenService {
    async fn resolve(&self, token: &str) -> Result<Account, AccountError> {
        self.store
            .find_account_by_token(token)
            .await?
            .ok_or(AccountError::InvalidToken)
    }

    async fn obtain(&self, username: &str, password: &str) -> Result<String, AccountError> {
        // Removed accounts cannot re-obtain their token even with the right
        // password; they are invisible to every normal path.
        let account = match self.store.find_account_by_username(username).await? {
            Some(account) if !account.is_removed => account,
            _ => return Err(AccountError::InvalidCredentials),
        };

        let is_valid = self
            .store
            .verify_account_password(account.id, password)
            .await?;
        if !is_valid {
            return Err(AccountError::InvalidCredentials);
        }

        self.store
            .account_token(account.id)
            .await?
            .ok_or_else(|| AccountError::Internal("Token missing for account".to_string()))
    }
}
