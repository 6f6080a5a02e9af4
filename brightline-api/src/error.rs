/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// # Response format
///
/// ```json
/// {
///   "success": false,
///   "error": "validation_error",
///   "message": "Request validation failed",
///   "errors": { "slug": "must contain only lowercase letters, digits and single hyphens between them" }
/// }
/// ```
///
/// `errors` is present only for validation failures.
///
/// # Example
///
/// ```
/// use brightline_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Service not found".to_string()));
///     }
///     Ok(Json(json!({ "success": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brightline_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, password::PasswordError},
    intake::IntakeError,
    models::StoreError,
    validation::FieldErrors,
};
use serde::Serialize;
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403) - authenticated but not allowed
    Forbidden(String),

    /// Security gate rejection (403) - CAPTCHA or unsafe input
    Security(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (400) - duplicate unique field such as a slug or email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(FieldErrors),

    /// Internal server error (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Error code (e.g., "validation_error", "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field → reason, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ApiError {
    /// Validation error on a single field
    pub fn field(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, reason);
        ApiError::ValidationError(errors)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::Security(msg) => write!(f, "Security check failed: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, errors) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Security(msg) => (StatusCode::FORBIDDEN, "security_error", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_code.to_string(),
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return ApiError::Conflict(conflict_message(db_err.message()));
                }
                if db_err.is_foreign_key_violation() {
                    return ApiError::NotFound("Referenced resource does not exist".to_string());
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Turns "UNIQUE constraint failed: services.slug" into "slug already exists"
fn conflict_message(db_message: &str) -> String {
    db_message
        .split_once("constraint failed: ")
        .and_then(|(_, columns)| columns.split(", ").next())
        .and_then(|column| column.rsplit('.').next())
        .filter(|column| !column.is_empty() && !column.contains(' '))
        .map(|column| format!("{} already exists", column))
        .unwrap_or_else(|| "Resource already exists".to_string())
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingReference { entity, id } => {
                ApiError::NotFound(format!("{} {} does not exist", entity, id))
            }
            StoreError::Database(e) => e.into(),
        }
    }
}

/// Convert intake pipeline errors to API errors
impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(errors) => ApiError::ValidationError(errors),
            IntakeError::Security(failure) => ApiError::Security(failure.message()),
            IntakeError::Persistence(e) => {
                ApiError::InternalError(format!("Failed to persist submission: {}", e))
            }
            IntakeError::Storage(e) => ApiError::InternalError(format!("Failed to store upload: {}", e)),
        }
    }
}

/// Convert field errors to API errors
impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthzError::NotOwner => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(e) => ApiError::InternalError(format!("Failed to create token: {}", e)),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}
