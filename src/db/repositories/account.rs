use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr, TransactionError, TransactionTrait,
};
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{accounts, auth_tokens};
use crate::security::{password, token};

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub public_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub is_removed: bool,
    pub created_at: String,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            public_id: model.public_id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            is_staff: model.is_staff,
            is_superuser: model.is_superuser,
            is_active: model.is_active,
            is_removed: model.is_removed,
            created_at: model.created_at,
        }
    }
}

/// A freshly created account together with its bearer token.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub account: Account,
    pub token: String,
}

/// Column values for a new account row. The password arrives pre-hashed and
/// the privilege flags are forced below, so neither appears here.
#[derive(Debug, Clone)]
pub struct NewAccountRecord {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Mutable profile columns. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create an account and its bearer token in a single transaction.
    ///
    /// The account row and its token are never observable independently.
    /// `public_id` and `created_at` are assigned here; privilege flags are
    /// forced to safe defaults no matter what the caller sent upstream.
    /// A concurrent create with the same username loses on the unique
    /// constraint and surfaces as [`CreateError::DuplicateUsername`].
    pub async fn create(&self, record: NewAccountRecord) -> Result<RegisteredAccount, CreateError> {
        let public_id = uuid::Uuid::new_v4().to_string();
        let bearer = token::generate_token();
        let now = chrono::Utc::now().to_rfc3339();

        let result = self
            .conn
            .transaction::<_, (accounts::Model, String), DbErr>(|txn| {
                Box::pin(async move {
                    let account = accounts::ActiveModel {
                        public_id: Set(public_id),
                        username: Set(record.username),
                        password_hash: Set(record.password_hash),
                        first_name: Set(record.first_name),
                        last_name: Set(record.last_name),
                        email: Set(record.email),
                        is_staff: Set(false),
                        is_superuser: Set(false),
                        is_active: Set(true),
                        is_removed: Set(false),
                        created_at: Set(now.clone()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    auth_tokens::ActiveModel {
                        account_id: Set(account.id),
                        token: Set(bearer.clone()),
                        created_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    Ok((account, bearer))
                })
            })
            .await;

        match result {
            Ok((model, bearer)) => Ok(RegisteredAccount {
                account: Account::from(model),
                token: bearer,
            }),
            Err(err) if is_unique_violation(&err) => Err(CreateError::DuplicateUsername),
            Err(err) => Err(CreateError::Other(
                anyhow::Error::new(err).context("Failed to create account"),
            )),
        }
    }

    /// Live lookup used by every externally visible read/update/delete path.
    pub async fn find_live_by_public_id(&self, public_id: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::PublicId.eq(public_id))
            .filter(accounts::Column::IsRemoved.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query account by public id")?;

        Ok(account.map(Account::from))
    }

    /// Username lookup across all accounts, removed included. Removed
    /// accounts still occupy their username slot.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account.map(Account::from))
    }

    /// Token resolution. Deliberately ignores `is_removed`: resolution and
    /// visibility are independent layers; the service decides what a
    /// resolved-but-removed account may see.
    pub async fn find_by_token(&self, bearer: &str) -> Result<Option<Account>> {
        let pair = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::Token.eq(bearer))
            .find_also_related(accounts::Entity)
            .one(&self.conn)
            .await
            .context("Failed to resolve bearer token")?;

        Ok(pair.and_then(|(_, account)| account.map(Account::from)))
    }

    /// The token issued for an account at creation time.
    pub async fn token_for_account(&self, account_id: i32) -> Result<Option<String>> {
        let row = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::AccountId.eq(account_id))
            .one(&self.conn)
            .await
            .context("Failed to query token for account")?;

        Ok(row.map(|t| t.token))
    }

    /// Administrative view: every account, removed included.
    pub async fn list_all(&self) -> Result<Vec<Account>> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list accounts")?;

        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Apply mutable profile columns only. Identity, privilege, and
    /// timestamp columns are never touched here regardless of caller input.
    pub async fn update_profile(
        &self,
        account_id: i32,
        changes: ProfileChanges,
    ) -> Result<Account> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let mut active: accounts::ActiveModel = model.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        let updated = active.update(&self.conn).await?;

        Ok(Account::from(updated))
    }

    /// Verify a password for an account.
    /// Note: This uses `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn verify_password(&self, account_id: i32, candidate: &str) -> Result<bool> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password verification")?;

        let Some(model) = model else {
            return Ok(false);
        };

        let password_hash = model.password_hash;
        let candidate = candidate.to_string();

        let is_valid =
            task::spawn_blocking(move || password::verify_password(&candidate, &password_hash))
                .await
                .context("Password verification task panicked")?;

        Ok(is_valid)
    }

    /// Re-hash and persist a new password for an account.
    pub async fn update_password(
        &self,
        account_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let new_password = new_password.to_string();
        let config = config.clone();
        let new_hash =
            task::spawn_blocking(move || password::hash_password(&new_password, &config))
                .await
                .context("Password hashing task panicked")??;

        let mut active: accounts::ActiveModel = model.into();
        active.password_hash = Set(new_hash);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Mark an account removed. The row and its token stay in storage; the
    /// account simply stops being visible to the live query surface.
    pub async fn soft_delete(&self, account_id: i32) -> Result<()> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for removal")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let mut active: accounts::ActiveModel = model.into();
        active.is_removed = Set(true);
        active.update(&self.conn).await?;

        Ok(())
    }
}

fn is_unique_violation(err: &TransactionError<DbErr>) -> bool {
    let db_err = match err {
        TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
    };

    matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
