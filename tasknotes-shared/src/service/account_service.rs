/// Account use-cases: registration, login and token refresh
///
/// Password hashing and verification run on the blocking pool so a burst of
/// logins does not stall the async workers.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use super::{ServiceError, ServiceResult};
use crate::auth::{
    jwt::{self, Claims, TokenType},
    password,
};
use crate::models::user::{CreateUser, User};
use crate::store::Store;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn username_chars(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "-._@+".contains(c);
    if username.chars().all(allowed) {
        return Ok(());
    }

    let mut error = ValidationError::new("username_chars");
    error.message =
        Some("Username may only contain letters, digits and the characters - . _ @ +".into());
    Err(error)
}

fn password_strength(password: &str) -> Result<(), ValidationError> {
    password::validate_password_strength(password).map_err(|message| {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(message.into());
        error
    })
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(custom(function = "password_strength"))]
    pub password: String,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// An authenticated user and a fresh token pair
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Account service facade over a [`Store`]
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_secret: Arc<str>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Creates an account and signs the new user in
    ///
    /// Fails with [`ServiceError::Conflict`] if the username or email is
    /// already registered (case-insensitive).
    pub async fn register(&self, input: RegisterInput) -> ServiceResult<Session> {
        input.validate()?;

        let RegisterInput {
            username,
            email,
            password: plain,
        } = input;
        let password_hash = blocking(move || password::hash_password(&plain)).await?;

        let user = self
            .store
            .create_user(CreateUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password_hash,
            })
            .await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        self.session(user)
    }

    /// Checks credentials and records the login
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, input: LoginInput) -> ServiceResult<Session> {
        let Some(user) = self.store.find_user_by_username(input.username.trim()).await? else {
            warn!(username = %input.username, "Login for unknown user");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let hash = user.password_hash.clone();
        let valid = blocking(move || password::verify_password(&input.password, &hash)).await?;
        if !valid {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.store.record_login(user.id).await?;
        info!(user_id = %user.id, "User logged in");

        self.session(user)
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The account must still exist.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<String> {
        let claims = jwt::validate_refresh_token(refresh_token, &self.jwt_secret)
            .map_err(|e| ServiceError::Unauthorized(e.to_string()))?;

        if self.store.find_user(claims.sub).await?.is_none() {
            return Err(ServiceError::Unauthorized("Account no longer exists".to_string()));
        }

        jwt::refresh_access_token(refresh_token, &self.jwt_secret)
            .map_err(|e| ServiceError::Unauthorized(e.to_string()))
    }

    fn session(&self, user: User) -> ServiceResult<Session> {
        let access = Claims::new(user.id, user.username.clone(), TokenType::Access);
        let refresh = Claims::new(user.id, user.username.clone(), TokenType::Refresh);

        let access_token = jwt::create_token(&access, &self.jwt_secret)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let refresh_token = jwt::create_token(&refresh, &self.jwt_secret)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(Session {
            user,
            access_token,
            refresh_token,
        })
    }
}

async fn blocking<T, E, F>(f: F) -> ServiceResult<T>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_access_token;
    use crate::store::{MemoryStore, UserStore};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn service() -> (AccountService, MemoryStore) {
        let store = MemoryStore::new();
        (AccountService::new(Arc::new(store.clone()), SECRET), store)
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "Passw0rdOk".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_issues_tokens() {
        let (accounts, _) = service();

        let session = accounts.register(alice()).await.unwrap();

        assert_eq!(session.user.username, "alice");
        let claims = validate_access_token(&session.access_token, SECRET).unwrap();
        assert_eq!(claims.sub, session.user.id);
        assert_eq!(claims.username, "alice");
        assert!(jwt::validate_refresh_token(&session.refresh_token, SECRET).is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let (accounts, _) = service();
        accounts.register(alice()).await.unwrap();

        let mut again = alice();
        again.username = "ALICE".to_string();
        again.email = "new@example.com".to_string();
        let err = accounts.register(again).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Username is already taken"));

        let mut same_email = alice();
        same_email.username = "alice2".to_string();
        let err = accounts.register(same_email).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Email is already taken"));
    }

    #[tokio::test]
    async fn test_register_validates_every_field() {
        let (accounts, _) = service();

        let err = accounts
            .register(RegisterInput {
                username: "a b".to_string(),
                email: "not-an-email".to_string(),
                password: "weak".to_string(),
            })
            .await
            .unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let (accounts, store) = service();
        let registered = accounts.register(alice()).await.unwrap();
        assert!(registered.user.last_login_at.is_none());

        let session = accounts
            .login(LoginInput {
                username: "Alice".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.id, registered.user.id);
        let stored = store.find_user(registered.user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (accounts, _) = service();
        accounts.register(alice()).await.unwrap();

        let wrong_password = accounts
            .login(LoginInput {
                username: "alice".to_string(),
                password: "Wr0ngPassword".to_string(),
            })
            .await
            .unwrap_err();
        let unknown_user = accounts
            .login(LoginInput {
                username: "mallory".to_string(),
                password: "Passw0rdOk".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh() {
        let (accounts, _) = service();
        let session = accounts.register(alice()).await.unwrap();

        let token = accounts.refresh(&session.refresh_token).await.unwrap();
        let claims = validate_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, session.user.id);

        assert!(matches!(
            accounts.refresh(&session.access_token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_for_unknown_account() {
        let (accounts, _) = service();
        let orphan = jwt::create_token(
            &Claims::new(uuid::Uuid::new_v4(), "ghost", TokenType::Refresh),
            SECRET,
        )
        .unwrap();

        assert!(matches!(
            accounts.refresh(&orphan).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
