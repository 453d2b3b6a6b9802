/// Bearer-token authentication for Axum
///
/// The API's auth layers call [`authenticate`] (or [`authenticate_stream`]
/// for the notification stream) on every protected request
/// and stores the resulting [`AuthContext`] in the request extensions;
/// handlers then take `AuthContext` as an extractor.
///
/// Tokens are read from the `Authorization: Bearer <token>` header. For the
/// notification stream, where browsers' `EventSource` cannot set headers, an
/// `access_token` query parameter is accepted as a fallback.
///
/// # Example
///
/// ```
/// use tasknotes_shared::auth::middleware::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Identity of the caller, added to request extensions after authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::WrongType { .. } => {
                AuthError::InvalidToken("Expected an access token".to_string())
            }
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn header_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Malformed authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Reads the bearer token from the `Authorization` header only
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    header_token(headers)?.ok_or(AuthError::MissingCredentials)
}

/// Like [`extract_token`], falling back to the `access_token` query
/// parameter when no `Authorization` header is present
///
/// Only for the notification stream.
pub fn extract_stream_token(headers: &HeaderMap, uri: &Uri) -> Result<String, AuthError> {
    if let Some(token) = header_token(headers)? {
        return Ok(token);
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.access_token)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

fn context_for(token: &str, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_access_token(token, secret)?;
    Ok(AuthContext::new(claims.sub, claims.username))
}

/// Validates the header access token and returns the caller's identity
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    context_for(&extract_token(headers)?, secret)
}

/// [`authenticate`] for the notification stream, which also accepts the
/// `access_token` query parameter
pub fn authenticate_stream(
    headers: &HeaderMap,
    uri: &Uri,
    secret: &str,
) -> Result<AuthContext, AuthError> {
    context_for(&extract_stream_token(headers, uri)?, secret)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
