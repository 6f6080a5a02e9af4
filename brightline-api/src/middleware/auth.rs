/// Authentication middleware
///
/// Validates Bearer access tokens from the `Authorization` header, reloads the
/// account and adds an [`AuthContext`] to the request extensions.
///
/// The account is read on every request so that deactivation and role changes
/// take effect before the token expires.
///
/// # Layers
///
/// - [`require_auth`]: rejects the request with 401 when no valid token is sent
/// - [`optional_auth`]: lets anonymous callers through, but still rejects a
///   token that is present and invalid
///
/// # Example
///
/// ```
/// use brightline_api::middleware::auth::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("User: {}, role: {}", auth.user_id, auth.role.as_str())
/// }
/// ```

use crate::{app::AppState, error::ApiError};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use brightline_shared::{
    auth::{
        authorization::{require_permission, Permission},
        jwt,
    },
    models::user::{User, UserRole},
};
use uuid::Uuid;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Current role, read from the account rather than the token
    pub role: UserRole,
}

impl AuthContext {
    /// Role of an optional caller; anonymous when absent
    pub fn role_of(auth: Option<&AuthContext>) -> UserRole {
        auth.map(|a| a.role).unwrap_or(UserRole::Anonymous)
    }

    /// 403 unless the caller's role holds `permission`
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        require_permission(self.role, permission)?;
        Ok(())
    }
}

/// Handlers take `AuthContext` to require a caller (401 otherwise) or
/// `Option<AuthContext>` to accept anonymous callers too
#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// JWT authentication layer for protected routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)?
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let auth = authenticate(&state, &token).await?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// JWT authentication layer for routes open to anonymous callers
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(&req)? {
        let auth = authenticate(&state, &token).await?;
        req.extensions_mut().insert(auth);
    }

    Ok(next.run(req).await)
}

/// Extracts the Bearer token, if an `Authorization` header was sent
fn bearer_token(req: &Request) -> Result<Option<String>, ApiError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    Ok(Some(token.trim().to_string()))
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthContext, ApiError> {
    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account not found or inactive".to_string()))?;

    Ok(AuthContext {
        user_id: user.id,
        role: user.role,
    })
}
