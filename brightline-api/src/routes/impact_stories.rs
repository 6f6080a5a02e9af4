/// Impact story endpoints
///
/// # Endpoints
///
/// - `GET /v1/impact-stories` - List stories (`?location=<slug>&featured=true&include=location,metrics`)
/// - `POST /v1/impact-stories` - Create story with metrics (content editor)
/// - `GET /v1/impact-stories/:slug` - One story
/// - `PATCH /v1/impact-stories/:slug` - Partial update; `metrics` replaces the list
/// - `DELETE /v1/impact-stories/:slug` - Delete story and its metrics

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Includes, QueryParams, ValidateRequest, ValidatedJson},
    middleware::auth::AuthContext,
    presentation::{
        impact_story_view, ApiResponse, Deleted, ImpactStoryView, IMPACT_STORY_INCLUDES,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brightline_shared::{
    auth::authorization::{can_view_unpublished, Permission},
    models::{
        impact_story::{
            CreateImpactMetric, CreateImpactStory, ImpactStory, ImpactStoryFilter,
            UpdateImpactStory,
        },
        location::Location,
        Page,
    },
    validation::{
        check_max_chars, check_required_text, double_option, validate_not_blank, validate_slug,
        FieldErrors,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct ImpactStoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Location slug
    pub location: Option<String>,
    pub featured: Option<bool>,
    pub include: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct MetricRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub label: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub value: String,

    /// e.g. "people", "%"
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub unit: Option<String>,

    pub order: Option<i64>,
}

impl From<MetricRequest> for CreateImpactMetric {
    fn from(metric: MetricRequest) -> Self {
        Self {
            label: metric.label.trim().to_string(),
            value: metric.value.trim().to_string(),
            unit: metric.unit,
            order: metric.order,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateImpactStoryRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 1000, message = "must be at most 1000 characters")
    )]
    pub summary: String,

    #[validate(length(max = 20000, message = "must be at most 20000 characters"))]
    pub body: Option<String>,

    #[validate(required(message = "is required"))]
    pub location_id: Option<Uuid>,

    pub is_featured: bool,

    pub is_published: bool,

    #[validate(nested, length(max = 50, message = "must have at most 50 entries"))]
    pub metrics: Vec<MetricRequest>,
}

/// Update impact story request; only `body` may be cleared with `null`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateImpactStoryRequest {
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub body: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub location_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub is_featured: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub is_published: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub metrics: Option<Option<Vec<MetricRequest>>>,
}

impl ValidateRequest for UpdateImpactStoryRequest {
    fn validate_request(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(slug) = errors.not_null("slug", &self.slug) {
            errors.check("slug", validate_slug(slug));
        }
        if let Some(title) = errors.not_null("title", &self.title) {
            errors.check("title", check_required_text(title, 200));
        }
        if let Some(summary) = errors.not_null("summary", &self.summary) {
            errors.check("summary", check_required_text(summary, 1000));
        }
        if let Some(Some(body)) = &self.body {
            errors.check("body", check_max_chars(body, 20000));
        }
        errors.not_null("location_id", &self.location_id);
        errors.not_null("is_featured", &self.is_featured);
        errors.not_null("is_published", &self.is_published);
        if let Some(metrics) = errors.not_null("metrics", &self.metrics) {
            if metrics.len() > 50 {
                errors.add("metrics", "must have at most 50 entries");
            }
            errors.nested_list("metrics", metrics);
        }

        errors.into_result()
    }
}

impl From<UpdateImpactStoryRequest> for UpdateImpactStory {
    fn from(req: UpdateImpactStoryRequest) -> Self {
        Self {
            slug: req.slug.flatten(),
            title: req.title.flatten().map(|t| t.trim().to_string()),
            summary: req.summary.flatten().map(|s| s.trim().to_string()),
            body: req.body,
            location_id: req.location_id.flatten(),
            is_featured: req.is_featured.flatten(),
            is_published: req.is_published.flatten(),
            metrics: req
                .metrics
                .flatten()
                .map(|metrics| metrics.into_iter().map(Into::into).collect()),
        }
    }
}

pub async fn list_impact_stories(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    QueryParams(query): QueryParams<ImpactStoryQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ImpactStoryView>>>> {
    let includes = Includes::parse(query.include.as_deref(), IMPACT_STORY_INCLUDES)?;
    let page = Page::new(query.limit, query.offset);

    let mut filter = ImpactStoryFilter {
        published_only: !can_view_unpublished(AuthContext::role_of(auth.as_ref())),
        featured: query.featured,
        ..Default::default()
    };
    if let Some(slug) = query.location.as_deref() {
        match Location::find_by_slug(&state.db, slug).await? {
            Some(location) => filter.location_id = Some(location.id),
            None => {
                return Ok(Json(ApiResponse::list("Impact stories retrieved", Vec::new(), 0, page)))
            }
        }
    }

    let stories = ImpactStory::list(&state.db, &filter, page).await?;
    let total = ImpactStory::count(&state.db, &filter).await?;

    let mut views = Vec::with_capacity(stories.len());
    for story in stories {
        views.push(impact_story_view(&state.db, story, &includes).await?);
    }

    Ok(Json(ApiResponse::list("Impact stories retrieved", views, total, page)))
}

pub async fn get_impact_story(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(slug): Path<String>,
    QueryParams(query): QueryParams<ImpactStoryQuery>,
) -> ApiResult<Json<ApiResponse<ImpactStoryView>>> {
    let includes = Includes::parse(query.include.as_deref(), IMPACT_STORY_INCLUDES)?;
    let show_unpublished = can_view_unpublished(AuthContext::role_of(auth.as_ref()));

    let story = ImpactStory::find_by_slug(&state.db, &slug)
        .await?
        .filter(|s| s.is_published || show_unpublished)
        .ok_or_else(|| not_found(&slug))?;

    let view = impact_story_view(&state.db, story, &includes).await?;
    Ok(Json(ApiResponse::ok("Impact story retrieved", view)))
}

/// Creates an impact story
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `404 Not Found`: Location does not exist
/// - `400 Bad Request`: Slug already exists
pub async fn create_impact_story(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateImpactStoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ImpactStoryView>>)> {
    auth.require(Permission::ManageContent)?;

    let location_id = req
        .location_id
        .ok_or_else(|| ApiError::field("location_id", "is required"))?;

    let story = ImpactStory::create(
        &state.db,
        CreateImpactStory {
            slug: req.slug,
            title: req.title.trim().to_string(),
            summary: req.summary.trim().to_string(),
            body: req.body,
            location_id,
            is_featured: req.is_featured,
            is_published: req.is_published,
            metrics: req.metrics.into_iter().map(Into::into).collect(),
        },
    )
    .await?;
    info!(impact_story_id = %story.id, slug = %story.slug, created_by = %auth.user_id, "Impact story created");

    let includes = Includes::default().with("location").with("metrics");
    let view = impact_story_view(&state.db, story, &includes).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Impact story created", view))))
}

pub async fn update_impact_story(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateImpactStoryRequest>,
) -> ApiResult<Json<ApiResponse<ImpactStoryView>>> {
    auth.require(Permission::ManageContent)?;

    let existing = ImpactStory::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    let story = ImpactStory::update(&state.db, existing.id, req.into())
        .await?
        .ok_or_else(|| not_found(&slug))?;
    info!(impact_story_id = %story.id, updated_by = %auth.user_id, "Impact story updated");

    let includes = Includes::default().with("location").with("metrics");
    let view = impact_story_view(&state.db, story, &includes).await?;
    Ok(Json(ApiResponse::ok("Impact story updated", view)))
}

pub async fn delete_impact_story(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    auth.require(Permission::ManageContent)?;

    let story = ImpactStory::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    if !ImpactStory::delete(&state.db, story.id).await? {
        return Err(not_found(&slug));
    }
    info!(impact_story_id = %story.id, deleted_by = %auth.user_id, "Impact story deleted");

    Ok(Json(ApiResponse::ok("Impact story deleted", Deleted { id: story.id })))
}

fn not_found(slug: &str) -> ApiError {
    ApiError::NotFound(format!("Impact story '{}' not found", slug))
}
