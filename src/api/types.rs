use serde::Serialize;

use crate::db::Account;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Outward account projection. The password hash and the privilege flags
/// are never serialized; `username`, `public_id`, and `created_at` are
/// read-only from the caller's perspective on every endpoint.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: i32,
    pub public_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            public_id: account.public_id,
            username: account.username,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            created_at: account.created_at,
        }
    }
}

/// Creation response: the projection plus a one-time token echo. No other
/// account route returns the token.
#[derive(Debug, Serialize)]
pub struct RegisteredAccountDto {
    #[serde(flatten)]
    pub account: AccountDto,
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenDto {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatusDto {
    pub version: String,
    pub uptime: u64,
    pub database: String,
}
