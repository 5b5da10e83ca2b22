//! `SeaORM` implementation of the `AccountService` trait.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::{
    Account, CreateError, NewAccountRecord, ProfileChanges, RegisteredAccount, Store,
};
use crate::security::password;
use crate::services::access;
use crate::services::account_service::{AccountError, AccountService, NewAccount, ProfileUpdate};

pub struct SeaOrmAccountService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn find_live(&self, public_id: &str) -> Result<Account, AccountError> {
        self.store
            .find_live_account_by_public_id(public_id)
            .await?
            .ok_or(AccountError::NotFound)
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, new_account: NewAccount) -> Result<RegisteredAccount, AccountError> {
        if new_account.username.trim().is_empty() {
            return Err(AccountError::Validation("Username is required".to_string()));
        }
        if new_account.password.is_empty() {
            return Err(AccountError::Validation("Password is required".to_string()));
        }
        if !new_account.email.is_empty() && !is_valid_email(&new_account.email) {
            return Err(AccountError::Validation(
                "Enter a valid email address".to_string(),
            ));
        }

        // Early duplicate check for a friendly error; the unique constraint
        // in storage stays the source of truth under concurrency.
        if self
            .store
            .find_account_by_username(&new_account.username)
            .await?
            .is_some()
        {
            return Err(AccountError::DuplicateUsername(new_account.username));
        }

        let plaintext = new_account.password.clone();
        let security = self.security.clone();
        let password_hash =
            task::spawn_blocking(move || password::hash_password(&plaintext, &security))
                .await
                .map_err(|e| {
                    AccountError::Internal(format!("Password hashing task panicked: {e}"))
                })??;

        let record = NewAccountRecord {
            username: new_account.username.clone(),
            password_hash,
            first_name: new_account.first_name,
            last_name: new_account.last_name,
            email: new_account.email,
        };

        match self.store.create_account(record).await {
            Ok(registered) => Ok(registered),
            Err(CreateError::DuplicateUsername) => {
                Err(AccountError::DuplicateUsername(new_account.username))
            }
            Err(CreateError::Other(err)) => Err(err.into()),
        }
    }

    async fn get_profile(&self, public_id: &str) -> Result<Account, AccountError> {
        self.find_live(public_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AccountError> {
        self.store.list_all_accounts().await.map_err(Into::into)
    }

    async fn update_profile(
        &self,
        public_id: &str,
        actor: Option<&Account>,
        update: ProfileUpdate,
    ) -> Result<Account, AccountError> {
        // Target first: an unknown or removed id is 404 even without
        // credentials. A valid target with a foreign actor is 403.
        let target = self.find_live(public_id).await?;
        access::authorize_mutation(actor, &target)?;

        if let Some(email) = update.email.as_deref()
            && !email.is_empty()
            && !is_valid_email(email)
        {
            return Err(AccountError::Validation(
                "Enter a valid email address".to_string(),
            ));
        }

        // A `password` key on this path is accepted and dropped. The
        // authenticatable password only changes via `change_password`.
        let changes = ProfileChanges {
            first_name: update.first_name,
            last_name: update.last_name,
            email: update.email,
        };

        let updated = self.store.update_account_profile(target.id, changes).await?;

        Ok(updated)
    }

    async fn change_password(
        &self,
        public_id: &str,
        actor: Option<&Account>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let target = self.find_live(public_id).await?;
        access::authorize_mutation(actor, &target)?;

        password::check_strength(new_password, &self.security)
            .map_err(|e| AccountError::Validation(e.to_string()))?;

        let old_ok = self
            .store
            .verify_account_password(target.id, old_password)
            .await?;
        if !old_ok {
            return Err(AccountError::InvalidCredentials);
        }

        self.store
            .update_account_password(target.id, new_password, &self.security)
            .await?;

        tracing::info!("Password changed for account: {}", target.username);

        Ok(())
    }

    async fn delete(&self, public_id: &str, actor: Option<&Account>) -> Result<(), AccountError> {
        let target = self.find_live(public_id).await?;
        access::authorize_mutation(actor, &target)?;

        self.store.soft_delete_account(target.id).await?;

        tracing::info!("Account removed: {}", target.username);

        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex pattern defined in code")
    });

    re.is_match(email)
}
