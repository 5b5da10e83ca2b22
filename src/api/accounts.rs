use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentAccount;
use super::types::{AccountDto, RegisteredAccountDto};
use super::{ApiError, ApiResponse, AppState};
use crate::services::{NewAccount, ProfileUpdate};

// ============================================================================
// Request Types
// ============================================================================

/// Registration body. Unknown keys (`is_staff`, `is_superuser`, `uuid`, ...)
/// are dropped by typed deserialization; missing keys become empty strings
/// and fail validation in the service rather than in the framework.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Generic profile update. `username` is read-only on this path and any
/// incoming value is dropped with the rest of the unknown keys. A `password`
/// key is deserialized for wire compatibility but has no authentication
/// effect; see `AccountService::update_profile`.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct UpdateAccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/users
/// Open registration; the response echoes the bearer token exactly once.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registered = state
        .accounts
        .register(NewAccount {
            username: payload.username,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
        })
        .await?;

    tracing::info!("Account created: {}", registered.account.username);

    let dto = RegisteredAccountDto {
        account: AccountDto::from(registered.account),
        auth_token: registered.token,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

/// GET /api/v1/users/{public_id}
/// Public read: any caller, authenticated or not.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let public_id = parse_public_id(&public_id)?;

    let account = state.accounts.get_profile(&public_id).await?;

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// PUT /api/v1/users/{public_id}
/// Self-only mutation of the profile fields.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
    Extension(CurrentAccount(actor)): Extension<CurrentAccount>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let public_id = parse_public_id(&public_id)?;

    let update = ProfileUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password: payload.password,
    };

    let account = state
        .accounts
        .update_profile(&public_id, actor.as_ref(), update)
        .await?;

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// DELETE /api/v1/users/{public_id}
/// Self-only soft delete. The username stays reserved afterwards.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
    Extension(CurrentAccount(actor)): Extension<CurrentAccount>,
) -> Result<StatusCode, ApiError> {
    let public_id = parse_public_id(&public_id)?;

    state.accounts.delete(&public_id, actor.as_ref()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/users/{public_id}/password
/// Self-only; re-verifies the old password before rotating.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
    Extension(CurrentAccount(actor)): Extension<CurrentAccount>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let public_id = parse_public_id(&public_id)?;

    state
        .accounts
        .change_password(
            &public_id,
            actor.as_ref(),
            &payload.old_password,
            &payload.new_password,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

/// Malformed public ids surface as 404, the same as a lookup of an id that
/// was never issued.
fn parse_public_id(raw: &str) -> Result<String, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map(|parsed| parsed.to_string())
        .map_err(|_| ApiError::not_found(format!("Account {raw} not found")))
}
