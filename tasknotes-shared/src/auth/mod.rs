/// Authentication utilities
///
/// - [`password`]: Argon2id password hashing and strength checks
/// - [`jwt`]: HS256 access/refresh token issuance and validation
/// - [`middleware`]: bearer-token extraction and the [`middleware::AuthContext`] extractor
///
/// # Example
///
/// ```no_run
/// use tasknotes_shared::auth::password::{hash_password, verify_password};
/// use tasknotes_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Us3r_password")?;
/// assert!(verify_password("Us3r_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "alice", TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
