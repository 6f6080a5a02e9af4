/// Case study endpoints
///
/// # Endpoints
///
/// - `GET /v1/case-studies` - List case studies, newest first
/// - `POST /v1/case-studies` - Create case study (content editor)
/// - `GET /v1/case-studies/:slug` - One case study
/// - `PATCH /v1/case-studies/:slug` - Partial update
/// - `DELETE /v1/case-studies/:slug` - Delete case study
///
/// # Query Parameters
///
/// - `industry`: Industry slug to filter on
/// - `featured`: `true` or `false`
/// - `include`: Any of `industry`, `results`, `services`
/// - `limit`, `offset`: Pagination

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Includes, QueryParams, ValidateRequest, ValidatedJson},
    middleware::auth::AuthContext,
    presentation::{case_study_view, ApiResponse, CaseStudyView, Deleted, CASE_STUDY_INCLUDES},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brightline_shared::{
    auth::authorization::{can_view_unpublished, Permission},
    models::{
        case_study::{
            CaseStudy, CaseStudyFilter, CreateCaseStudy, CreateCaseStudyResult, UpdateCaseStudy,
        },
        industry::Industry,
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

const MAX_LINKED: usize = 50;

/// List/detail query
#[derive(Debug, Default, Deserialize)]
pub struct CaseStudyQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub industry: Option<String>,
    pub featured: Option<bool>,
    pub include: Option<String>,
}

/// One measured outcome of a case study
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ResultRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub metric: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub value: String,

    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,

    pub order: Option<i64>,
}

impl From<ResultRequest> for CreateCaseStudyResult {
    fn from(result: ResultRequest) -> Self {
        Self {
            metric: result.metric.trim().to_string(),
            value: result.value.trim().to_string(),
            description: result.description,
            order: result.order,
        }
    }
}

/// Create case study request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCaseStudyRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub client_name: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 1000, message = "must be at most 1000 characters")
    )]
    pub summary: String,

    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub challenge: Option<String>,

    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub solution: Option<String>,

    #[validate(required(message = "is required"))]
    pub industry_id: Option<Uuid>,

    pub is_featured: bool,

    pub is_published: bool,

    #[validate(nested, length(max = 50, message = "must have at most 50 entries"))]
    pub results: Vec<ResultRequest>,

    #[validate(length(max = 50, message = "must have at most 50 entries"))]
    pub service_ids: Vec<Uuid>,
}

/// Update case study request
///
/// `challenge` and `solution` accept `null`; `results` and `service_ids`
/// replace the existing lists.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCaseStudyRequest {
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub client_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub challenge: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub solution: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub industry_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub is_featured: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub is_published: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub results: Option<Option<Vec<ResultRequest>>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub service_ids: Option<Option<Vec<Uuid>>>,
}

impl ValidateRequest for UpdateCaseStudyRequest {
    fn validate_request(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(slug) = errors.not_null("slug", &self.slug) {
            errors.check("slug", validate_slug(slug));
        }
        if let Some(title) = errors.not_null("title", &self.title) {
            errors.check("title", check_required_text(title, 200));
        }
        if let Some(client_name) = errors.not_null("client_name", &self.client_name) {
            errors.check("client_name", check_required_text(client_name, 200));
        }
        if let Some(summary) = errors.not_null("summary", &self.summary) {
            errors.check("summary", check_required_text(summary, 1000));
        }
        if let Some(Some(challenge)) = &self.challenge {
            errors.check("challenge", check_max_chars(challenge, 10000));
        }
        if let Some(Some(solution)) = &self.solution {
            errors.check("solution", check_max_chars(solution, 10000));
        }
        errors.not_null("industry_id", &self.industry_id);
        errors.not_null("is_featured", &self.is_featured);
        errors.not_null("is_published", &self.is_published);
        if let Some(results) = errors.not_null("results", &self.results) {
            if results.len() > MAX_LINKED {
                errors.add("results", "must have at most 50 entries");
            }
            errors.nested_list("results", results);
        }
        if let Some(service_ids) = errors.not_null("service_ids", &self.service_ids) {
            if service_ids.len() > MAX_LINKED {
                errors.add("service_ids", "must have at most 50 entries");
            }
        }

        errors.into_result()
    }
}

impl From<UpdateCaseStudyRequest> for UpdateCaseStudy {
    fn from(req: UpdateCaseStudyRequest) -> Self {
        Self {
            slug: req.slug.flatten(),
            title: req.title.flatten().map(|t| t.trim().to_string()),
            client_name: req.client_name.flatten().map(|c| c.trim().to_string()),
            summary: req.summary.flatten().map(|s| s.trim().to_string()),
            challenge: req.challenge,
            solution: req.solution,
            industry_id: req.industry_id.flatten(),
            is_featured: req.is_featured.flatten(),
            is_published: req.is_published.flatten(),
            results: req
                .results
                .flatten()
                .map(|results| results.into_iter().map(Into::into).collect()),
            service_ids: req.service_ids.flatten(),
        }
    }
}

/// Lists case studies
///
/// An unknown `industry` slug yields an empty page.
pub async fn list_case_studies(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    QueryParams(query): QueryParams<CaseStudyQuery>,
) -> ApiResult<Json<ApiResponse<Vec<CaseStudyView>>>> {
    let includes = Includes::parse(query.include.as_deref(), CASE_STUDY_INCLUDES)?;
    let page = Page::new(query.limit, query.offset);

    let mut filter = CaseStudyFilter {
        published_only: !can_view_unpublished(AuthContext::role_of(auth.as_ref())),
        featured: query.featured,
        ..Default::default()
    };
    if let Some(slug) = query.industry.as_deref() {
        match Industry::find_by_slug(&state.db, slug).await? {
            Some(industry) => filter.industry_id = Some(industry.id),
            None => {
                return Ok(Json(ApiResponse::list("Case studies retrieved", Vec::new(), 0, page)))
            }
        }
    }

    let studies = CaseStudy::list(&state.db, &filter, page).await?;
    let total = CaseStudy::count(&state.db, &filter).await?;

    let mut views = Vec::with_capacity(studies.len());
    for study in studies {
        views.push(case_study_view(&state.db, study, &includes).await?);
    }

    Ok(Json(ApiResponse::list("Case studies retrieved", views, total, page)))
}

/// Gets one case study
///
/// # Errors
///
/// - `404 Not Found`: No such case study, or unpublished and the caller is not an editor
pub async fn get_case_study(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(slug): Path<String>,
    QueryParams(query): QueryParams<CaseStudyQuery>,
) -> ApiResult<Json<ApiResponse<CaseStudyView>>> {
    let includes = Includes::parse(query.include.as_deref(), CASE_STUDY_INCLUDES)?;
    let show_unpublished = can_view_unpublished(AuthContext::role_of(auth.as_ref()));

    let study = CaseStudy::find_by_slug(&state.db, &slug)
        .await?
        .filter(|s| s.is_published || show_unpublished)
        .ok_or_else(|| not_found(&slug))?;

    let view = case_study_view(&state.db, study, &includes).await?;
    Ok(Json(ApiResponse::ok("Case study retrieved", view)))
}

/// Creates a case study with its results and service links
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `404 Not Found`: Industry or a linked service does not exist
/// - `400 Bad Request`: Slug already exists
/// - `422 Unprocessable Entity`: Invalid fields
pub async fn create_case_study(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateCaseStudyRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CaseStudyView>>)> {
    auth.require(Permission::ManageContent)?;

    let industry_id = req
        .industry_id
        .ok_or_else(|| ApiError::field("industry_id", "is required"))?;

    let study = CaseStudy::create(
        &state.db,
        CreateCaseStudy {
            slug: req.slug,
            title: req.title.trim().to_string(),
            client_name: req.client_name.trim().to_string(),
            summary: req.summary.trim().to_string(),
            challenge: req.challenge,
            solution: req.solution,
            industry_id,
            is_featured: req.is_featured,
            is_published: req.is_published,
            results: req.results.into_iter().map(Into::into).collect(),
            service_ids: req.service_ids,
        },
    )
    .await?;
    info!(case_study_id = %study.id, slug = %study.slug, created_by = %auth.user_id, "Case study created");

    let includes = Includes::default().with("industry").with("results").with("services");
    let view = case_study_view(&state.db, study, &includes).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Case study created", view))))
}

/// Updates a case study
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `404 Not Found`: No such case study, or a new industry/service does not exist
pub async fn update_case_study(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCaseStudyRequest>,
) -> ApiResult<Json<ApiResponse<CaseStudyView>>> {
    auth.require(Permission::ManageContent)?;

    let existing = CaseStudy::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    let study = CaseStudy::update(&state.db, existing.id, req.into())
        .await?
        .ok_or_else(|| not_found(&slug))?;
    info!(case_study_id = %study.id, updated_by = %auth.user_id, "Case study updated");

    let includes = Includes::default().with("industry").with("results").with("services");
    let view = case_study_view(&state.db, study, &includes).await?;
    Ok(Json(ApiResponse::ok("Case study updated", view)))
}

pub async fn delete_case_study(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    auth.require(Permission::ManageContent)?;

    let study = CaseStudy::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| not_found(&slug))?;

    if !CaseStudy::delete(&state.db, study.id).await? {
        return Err(not_found(&slug));
    }
    info!(case_study_id = %study.id, deleted_by = %auth.user_id, "Case study deleted");

    Ok(Json(ApiResponse::ok("Case study deleted", Deleted { id: study.id })))
}

fn not_found(slug: &str) -> ApiError {
    ApiError::NotFound(format!("Case study '{}' not found", slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_industry() {
        let req: CreateCaseStudyRequest = serde_json::from_str(
            r#"{"slug": "acme", "title": "Acme", "client_name": "Acme Co", "summary": "Faster"}"#,
        )
        .unwrap();

        let errors = req.validate_request().unwrap_err();
        assert_eq!(errors.get("industry_id"), Some("is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_update_request_rejects_null_industry() {
        let req: UpdateCaseStudyRequest =
            serde_json::from_str(r#"{"industry_id": null, "challenge": null}"#).unwrap();
        let errors = req.validate_request().unwrap_err();
        assert_eq!(errors.get("industry_id"), Some("cannot be null"));
        assert_eq!(errors.get("challenge"), None);
    }
}
