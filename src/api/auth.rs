use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::types::TokenDto;
use super::{ApiError, ApiResponse, AppState};
use crate::db::Account;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ObtainTokenRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Acting account resolved from the request's bearer token, if any.
#[derive(Clone, Debug, Default)]
pub struct CurrentAccount(pub Option<Account>);

/// Token-resolution middleware.
///
/// Reads `Authorization: Token <t>` or `Authorization: Bearer <t>`, resolves
/// the owning account, and stores it as a request extension. It never
/// rejects on its own: reads are open to anonymous callers, and mutating
/// handlers turn a missing actor into 403 themselves. A token that fails to
/// resolve leaves the request anonymous.
pub async fn resolve_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut current = CurrentAccount(None);

    if let Some(bearer) = extract_token(request.headers())
        && let Ok(account) = state.tokens.resolve(&bearer).await
    {
        tracing::Span::current().record("user_id", account.username.as_str());
        current = CurrentAccount(Some(account));
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

/// Extract the bearer token from the Authorization header. Both the `Token`
/// keyword and the `Bearer` scheme are accepted.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
    {
        if let Some(token) = auth_str.strip_prefix("Token ") {
            return Some(token.trim().to_string());
        }
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api-token-auth
/// Returns the account's existing token for a valid username/password pair.
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ObtainTokenRequest>,
) -> Result<Json<ApiResponse<TokenDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let token = state
        .tokens
        .obtain(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(TokenDto { token })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_token_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Token abc123"));

        assert_eq!(extract_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extracts_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123 "));

        assert_eq!(extract_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn ignores_other_schemes_and_missing_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers), None);
    }
}
