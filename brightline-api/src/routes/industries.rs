/// Industry endpoints
///
/// # Endpoints
///
/// - `GET /v1/industries` - List industries by name
/// - `POST /v1/industries` - Create industry (content editor)

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
    models::industry::{CreateIndustry, Industry},
    validation::{validate_not_blank, validate_slug},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Create industry request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateIndustryRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub name: String,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
}

pub async fn list_industries(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Industry>>>> {
    let industries = Industry::list(&state.db).await?;
    Ok(Json(ApiResponse::ok("Industries retrieved", industries)))
}

/// Creates an industry
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `400 Bad Request`: Slug already exists
pub async fn create_industry(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateIndustryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Industry>>)> {
    auth.require(Permission::ManageContent)?;

    let industry = Industry::create(
        &state.db,
        CreateIndustry {
            slug: req.slug,
            name: req.name.trim().to_string(),
            description: req.description,
        },
    )
    .await?;
    info!(industry_id = %industry.id, slug = %industry.slug, "Industry created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Industry created", industry))))
}
