/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    presentation::{ApiResponse, UserView},
};
use axum::{extract::State, Json};
use brightline_shared::{
    auth::{jwt, password},
    integrations::crm::CrmContact,
    models::user::{CreateUser, User, UserRole},
    validation::{validate_not_blank, FieldErrors},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    /// Password (will be validated for strength)
    pub password: String,

    /// Display name
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub full_name: String,

    /// Optional company name
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub company: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    /// Refresh token
    #[validate(custom(function = "validate_not_blank"))]
    pub refresh_token: String,
}

/// Tokens issued on register and login
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub user: UserView,

    /// Access token (1h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (1h)
    pub access_token: String,

    pub token_type: &'static str,

    pub expires_in: i64,
}

/// Register a new user
///
/// Creates a `registered` account and pushes it to the CRM as a contact. The
/// CRM sync is best-effort: a failure is logged and registration still
/// succeeds.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP4ss",
///   "full_name": "Jane Doe",
///   "company": "Acme"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed (including weak password)
/// - `400 Bad Request`: Email already exists
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<AuthTokens>>> {
    // Validate password strength
    let mut errors = FieldErrors::new();
    if let Err(reason) = password::validate_password_strength(&req.password) {
        errors.add("password", reason);
    }
    errors.into_result()?;

    // Hash password
    let password_hash = password::hash_password(&req.password)?;

    let mut user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_lowercase(),
            password_hash,
            full_name: req.full_name.trim().to_string(),
            company: req.company.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            role: UserRole::Registered,
        },
    )
    .await?;
    info!(user_id = %user.id, "User registered");

    // Best-effort CRM contact sync
    let contact = CrmContact {
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        company: user.company.clone(),
    };
    match state.integrations().crm.upsert_contact(&contact).await {
        Ok(Some(contact_id)) => {
            match User::set_crm_contact_id(&state.db, user.id, &contact_id).await {
                Ok(_) => user.crm_contact_id = Some(contact_id),
                Err(e) => warn!(user_id = %user.id, error = %e, "Failed to record CRM contact id"),
            }
        }
        Ok(None) => {}
        Err(e) => warn!(user_id = %user.id, error = %e, "CRM contact sync failed"),
    }

    let tokens = issue_tokens(&state, user)?;
    Ok(Json(ApiResponse::ok("Registration successful", tokens)))
}

/// Login endpoint
///
/// Authenticates a user and returns JWT tokens.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials or deactivated account
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthTokens>>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    // Find user by email
    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    // Update last login
    User::update_last_login(&state.db, user.id).await?;
    info!(user_id = %user.id, "User logged in");

    let tokens = issue_tokens(&state, user)?;
    Ok(Json(ApiResponse::ok("Login successful", tokens)))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token carrying the account's
/// current role.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or inactive account
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<RefreshResponse>>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account not found or inactive".to_string()))?;

    let access_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Access);
    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(ApiResponse::ok(
        "Token refreshed",
        RefreshResponse {
            access_token,
            token_type: "Bearer",
            expires_in: access_claims.expires_in_seconds(),
        },
    )))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthTokens, ApiError> {
    let access_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(AuthTokens {
        user: UserView::from(user),
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: access_claims.expires_in_seconds(),
    })
}
