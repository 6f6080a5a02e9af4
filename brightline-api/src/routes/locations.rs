/// Location endpoints
///
/// # Endpoints
///
/// - `GET /v1/locations` - List locations
/// - `POST /v1/locations` - Create location (content editor)

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ValidatedJson,
    middleware::auth::AuthContext,
    presentation::ApiResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use brightline_shared::{
    auth::authorization::Permission,
    models::location::{CreateLocation, Location},
    validation::{validate_not_blank, validate_slug},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Create location request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateLocationRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub name: String,

    /// State or province
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub region: Option<String>,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub country: String,
}

pub async fn list_locations(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Location>>>> {
    let locations = Location::list(&state.db).await?;
    Ok(Json(ApiResponse::ok("Locations retrieved", locations)))
}

/// Creates a location
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `400 Bad Request`: Slug already exists
pub async fn create_location(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateLocationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Location>>)> {
    auth.require(Permission::ManageContent)?;

    let location = Location::create(
        &state.db,
        CreateLocation {
            slug: req.slug,
            name: req.name.trim().to_string(),
            region: req.region,
            country: req.country.trim().to_string(),
        },
    )
    .await?;
    info!(location_id = %location.id, slug = %location.slug, "Location created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Location created", location))))
}
