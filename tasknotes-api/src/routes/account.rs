/// Account endpoints
///
/// - `POST /api/account/register` - Create an account and sign in
/// - `POST /api/account/login` - Exchange credentials for tokens
/// - `POST /api/account/refresh` - Exchange a refresh token for an access token
///
/// Register and login both answer with
///
/// ```json
/// { "username": "alice", "email": "alice@example.com", "token": "eyJ...", "refreshToken": "eyJ..." }
/// ```

use crate::{
    app::AppState,
    dto::{AccountResponse, RefreshRequest, TokenResponse},
    error::{ApiError, ApiResult},
    extract::AppJson,
};
use axum::extract::State;
use tasknotes_shared::service::{LoginInput, RegisterInput};

/// # Errors
///
/// - `400 Bad Request`: invalid username, email or weak password
/// - `409 Conflict`: username or email already registered
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterInput>,
) -> ApiResult<AppJson<AccountResponse>> {
    let session = state.accounts.register(req).await?;
    Ok(AppJson(session.into()))
}

/// # Errors
///
/// - `401 Unauthorized`: unknown username or wrong password
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginInput>,
) -> ApiResult<AppJson<AccountResponse>> {
    let session = state.accounts.login(req).await?;
    Ok(AppJson(session.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<AppJson<TokenResponse>> {
    if req.refresh_token.trim().is_empty() {
        return Err(ApiError::Unauthorized("Missing refresh token".to_string()));
    }

    let token = state.accounts.refresh(&req.refresh_token).await?;
    Ok(AppJson(TokenResponse { token }))
}
