/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/users/me` - Current account
/// - `GET /v1/users` - List accounts (administrator)
/// - `PATCH /v1/users/:id` - Change role, activation or profile (administrator)
///
/// Accounts are never deleted; administrators deactivate them instead.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{QueryParams, ValidateRequest, ValidatedJson},
    middleware::auth::AuthContext,
    presentation::{ApiResponse, UserView},
};
use axum::{
    extract::{Path, State},
    Json,
};
use brightline_shared::{
    auth::authorization::Permission,
    models::{
        user::{UpdateUser, User, UserRole},
        Page,
    },
    validation::{double_option, validate_not_blank, FieldErrors},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Pagination query
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Update user request
///
/// Absent fields are left unchanged; `company: null` clears the company.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub company: Option<Option<String>>,
}

impl ValidateRequest for UpdateUserRequest {
    fn validate_request(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.role == Some(UserRole::Anonymous) {
            errors.add("role", "cannot be anonymous");
        }
        if let Some(full_name) = &self.full_name {
            errors.check("full_name", validate_not_blank(full_name));
            if full_name.chars().count() > 200 {
                errors.add("full_name", "must be at most 200 characters");
            }
        }
        if let Some(Some(company)) = &self.company {
            if company.chars().count() > 200 {
                errors.add("company", "must be at most 200 characters");
            }
        }

        errors.into_result()
    }
}

/// Returns the authenticated account
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::ok("User retrieved", UserView::from(user))))
}

/// Lists accounts, newest first
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an administrator
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<ListUsersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UserView>>>> {
    auth.require(Permission::ManageUsers)?;

    let page = Page::new(query.limit, query.offset);
    let users = User::list(&state.db, page.limit, page.offset).await?;
    let total = User::count(&state.db).await?;

    Ok(Json(ApiResponse::list(
        "Users retrieved",
        users.into_iter().map(UserView::from).collect(),
        total,
        page,
    )))
}

/// Updates an account
///
/// Administrators cannot demote or deactivate themselves, so there is always
/// at least one administrator left.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an administrator
/// - `404 Not Found`: No such user
/// - `422 Unprocessable Entity`: Invalid fields
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    auth.require(Permission::ManageUsers)?;

    if id == auth.user_id {
        let mut errors = FieldErrors::new();
        if req.is_active == Some(false) {
            errors.add("is_active", "administrators cannot deactivate themselves");
        }
        if req.role.is_some_and(|role| role != UserRole::Administrator) {
            errors.add("role", "administrators cannot demote themselves");
        }
        errors.into_result()?;
    }

    let update = UpdateUser {
        full_name: req.full_name.map(|name| name.trim().to_string()),
        company: req.company,
        role: req.role,
        is_active: req.is_active,
        ..Default::default()
    };

    let user = User::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %id, updated_by = %auth.user_id, "User updated");

    Ok(Json(ApiResponse::ok("User updated", UserView::from(user))))
}
