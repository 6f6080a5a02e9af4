/// Service endpoints
///
/// # Endpoints
///
/// - `GET /v1/services` - List services (`?include=features`)
/// - `POST /v1/services` - Create service with features (content editor)
/// - `GET /v1/services/:slug` - Service with its features
/// - `PATCH /v1/services/:slug` - Partial update; `features` replaces the list
/// - `DELETE /v1/services/:slug` - Delete service and its features
///
/// Unpublished services are visible to content editors and administrators
/// only; everyone else gets a 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Includes, QueryParams, ValidateRequest, ValidatedJson},
    middleware::auth::AuthContext,
    presentation::{service_view, ApiResponse, Deleted, ServiceView, SERVICE_INCLUDES},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brightline_shared::{
    auth::authorization::{can_view_unpublished, Permission},
    models::{
        service::{CreateService, CreateServiceFeature, Service, UpdateService},
        Page,
    },
    validation::{
        check_max_chars, check_required_text, double_option, validate_not_blank, validate_slug,
        FieldErrors,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// List/detail query
#[derive(Debug, Default, Deserialize)]
pub struct ServiceQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include: Option<String>,
}

/// One feature of a service, in display order
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct FeatureRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Defaults to the position in the list
    pub order: Option<i64>,
}

impl From<FeatureRequest> for CreateServiceFeature {
    fn from(feature: FeatureRequest) -> Self {
        Self {
            title: feature.title.trim().to_string(),
            description: feature.description,
            order: feature.order,
        }
    }
}

/// Create service request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateServiceRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 500, message = "must be at most 500 characters")
    )]
    pub summary: String,

    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub icon: Option<String>,

    pub is_published: bool,

    pub display_order: i64,

    #[validate(nested, length(max = 50, message = "must have at most 50 entries"))]
    pub features: Vec<FeatureRequest>,
}

/// Update service request
///
/// Every field may be absent. `description` and `icon` accept `null` to
/// clear them; the other fields reject `null`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub is_published: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub display_order: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub features: Option<Option<Vec<FeatureRequest>>>,
}

impl ValidateRequest for UpdateServiceRequest {
    fn validate_request(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(slug) = errors.not_null("slug", &self.slug) {
            errors.check("slug", validate_slug(slug));
        }
        if let Some(title) = errors.not_null("title", &self.title) {
            errors.check("title", check_required_text(title, 200));
        }
        if let Some(summary) = errors.not_null("summary", &self.summary) {
            errors.check("summary", check_required_text(summary, 500));
        }
        if let Some(Some(description)) = &self.description {
            errors.check("description", check_max_chars(description, 10000));
        }
        if let Some(Some(icon)) = &self.icon {
            errors.check("icon", check_max_chars(icon, 200));
        }
        errors.not_null("is_published", &self.is_published);
        errors.not_null("display_order", &self.display_order);
        if let Some(features) = errors.not_null("features", &self.features) {
            if features.len() > 50 {
                errors.add("features", "must have at most 50 entries");
            }
            errors.nested_list("features", features);
        }

        errors.into_result()
    }
}

impl From<UpdateServiceRequest> for UpdateService {
    fn from(req: UpdateServiceRequest) -> Self {
        Self {
            slug: req.slug.flatten(),
            title: req.title.flatten().map(|t| t.trim().to_string()),
            summary: req.summary.flatten().map(|s| s.trim().to_string()),
            description: req.description,
            icon: req.icon,
            is_published: req.is_published.flatten(),
            display_order: req.display_order.flatten(),
            features: req
                .features
                .flatten()
                .map(|features| features.into_iter().map(Into::into).collect()),
        }
    }
}

/// Lists services by display order
pub async fn list_services(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    QueryParams(query): QueryParams<ServiceQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ServiceView>>>> {
    let includes = Includes::parse(query.include.as_deref(), SERVICE_INCLUDES)?;
    let published_only = !can_view_unpublished(AuthContext::role_of(auth.as_ref()));
    let page = Page::new(query.limit, query.offset);

    let services = Service::list(&state.db, published_only, page).await?;
    let total = Service::count(&state.db, published_only).await?;

    let mut views = Vec::with_capacity(services.len());
    for service in services {
        views.push(service_view(&state.db, service, &includes).await?);
    }

    Ok(Json(ApiResponse::list("Services retrieved", views, total, page)))
}

/// Gets one service; features are always included
///
/// # Errors
///
/// - `404 Not Found`: No such service, or unpublished and the caller is not an editor
pub async fn get_service(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(slug): Path<String>,
    QueryParams(query): QueryParams<ServiceQuery>,
) -> ApiResult<Json<ApiResponse<ServiceView>>> {
    let includes = Includes::parse(query.include.as_deref(), SERVICE_INCLUDES)?.with("features");
    let show_unpublished = can_view_unpublished(AuthContext::role_of(auth.as_ref()));

    let service = Service::find_by_slug(&state.db, &slug)
        .await?
        .filter(|s| s.is_published || show_unpublished)
        .ok_or_else(|| not_found(&slug))?;

    let view = service_view(&state.db, service, &includes).await?;
    Ok(Json(ApiResponse::ok("Service retrieved", view)))
}

/// Creates a service and its features
///
/// # Errors
///
/// - `401 Unauthorized`: No caller
/// - `403 Forbidden`: Caller is not a content editor
/// - `400 Bad Request`: Slug already exists
/// - `422 Unprocessable Entity`: Invalid fields
pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateServiceRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ServiceView>>)> {
    auth.require(Permission::ManageContent)?;

    let service = Service::create(
        &state.db,
        CreateService {
            slug: req.slug,
            title: req.title.trim().to_string(),
            summary: req.summary.trim().to_string(),
            description: req.description,
            icon: req.icon,
            is_published: req.is_published,
            display_order: req.display_order,
            features: req.features.into_iter().map(Into::into).collect(),
        },
    )
    .await?;
    info!(service_id = %service.id, slug = %service.slug, created_by = %auth.user_id, "Service created");

    let view = service_view(&state.db, service, &Includes::default().with("features")).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Service created", view))))
}

/// Updates a service
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `404 Not Found`: No such service
/// - `400 Bad Request`: New slug already exists
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateServiceRequest>,
) -> ApiResult<Json<ApiResponse<ServiceView>>> {
    auth.require(Permission::ManageContent)?;

    let existing = Service::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    let service = Service::update(&state.db, existing.id, req.into())
        .await?
        .ok_or_else(|| not_found(&slug))?;
    info!(service_id = %service.id, updated_by = %auth.user_id, "Service updated");

    let view = service_view(&state.db, service, &Includes::default().with("features")).await?;
    Ok(Json(ApiResponse::ok("Service updated", view)))
}

/// Deletes a service
///
/// Features and case-study links go with it; linked case studies stay.
pub async fn delete_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    auth.require(Permission::ManageContent)?;

    let service = Service::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    if !Service::delete(&state.db, service.id).await? {
        return Err(not_found(&slug));
    }
    info!(service_id = %service.id, deleted_by = %auth.user_id, "Service deleted");

    Ok(Json(ApiResponse::ok("Service deleted", Deleted { id: service.id })))
}

fn not_found(slug: &str) -> ApiError {
    ApiError::NotFound(format!("Service '{}' not found", slug))
}
