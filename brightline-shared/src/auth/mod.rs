/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and password policy
/// - [`jwt`]: HS256 access/refresh tokens carrying user id and role
/// - [`authorization`]: role permission checks
///
/// Request-level authentication (extracting the bearer token, loading the
/// user) lives in the API crate's middleware.
///
/// # Example
///
/// ```no_run
/// use brightline_shared::auth::password::{hash_password, verify_password};
/// use brightline_shared::auth::jwt::{create_token, Claims, TokenType};
/// use brightline_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Harbor5Lights")?;
/// assert!(verify_password("Harbor5Lights", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::Registered, TokenType::Access);
/// let token = create_token(&claims, "a-secret-of-at-least-thirty-two-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
