use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{
    Account, CreateError, NewAccountRecord, ProfileChanges, RegisteredAccount,
};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    pub async fn create_account(
        &self,
        record: NewAccountRecord,
    ) -> Result<RegisteredAccount, CreateError> {
        self.account_repo().create(record).await
    }

    pub async fn find_live_account_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Option<Account>> {
        self.account_repo().find_live_by_public_id(public_id).await
    }

    pub async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.account_repo().find_by_username(username).await
    }

    pub async fn find_account_by_token(&self, token: &str) -> Result<Option<Account>> {
        self.account_repo().find_by_token(token).await
    }

    pub async fn account_token(&self, account_id: i32) -> Result<Option<String>> {
        self.account_repo().token_for_account(account_id).await
    }

    pub async fn list_all_accounts(&self) -> Result<Vec<Account>> {
        self.account_repo().list_all().await
    }

    pub async fn update_account_profile(
        &self,
        account_id: i32,
        changes: ProfileChanges,
    ) -> Result<Account> {
        self.account_repo().update_profile(account_id, changes).await
    }

    pub async fn verify_account_password(&self, account_id: i32, password: &str) -> Result<bool> {
        self.account_repo().verify_password(account_id, password).await
    }

    pub async fn update_account_password(
        &self,
        account_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.account_repo()
            .update_password(account_id, new_password, config)
            .await
    }

    pub async fn soft_delete_account(&self, account_id: i32) -> Result<()> {
        self.account_repo().soft_delete(account_id).await
    }
}
