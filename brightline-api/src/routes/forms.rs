/// Form intake endpoints
///
/// Contact, quote and demo forms all go through the intake pipeline:
/// validation, CAPTCHA and unsafe-input checks, persistence, then email
/// notification and CRM lead creation. The submitter gets a success response
/// as soon as the submission is stored; notification or CRM failures only
/// mark the stored row `failed`.
///
/// # Endpoints
///
/// - `POST /v1/forms/contact` - General enquiry
/// - `POST /v1/forms/quote` - Quote request
/// - `POST /v1/forms/demo` - Demo booking
/// - `GET /v1/forms/submissions` - Review submissions (administrator)
/// - `GET /v1/forms/submissions/:id` - One submission (administrator)
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "message": "Thanks for getting in touch, we'll reply shortly",
///   "submission_id": "1f0c…",
///   "status": "completed"
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ClientIp, JsonBody, QueryParams},
    middleware::auth::AuthContext,
    presentation::{ApiResponse, SubmissionView},
};
use axum::{
    extract::{Path, State},
    Json,
};
use brightline_shared::{
    auth::authorization::Permission,
    intake::{
        forms::{ContactForm, DemoForm, IntakeForm, QuoteForm},
        SubmissionContext,
    },
    models::{
        form_submission::{FormSubmission, FormType, SubmissionFilter, SubmissionStatus},
        Page,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Successful form submission
#[derive(Debug, Serialize, Deserialize)]
pub struct FormResponse {
    pub success: bool,
    pub message: String,
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
}

/// Submission list query
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub form_type: Option<FormType>,
    pub status: Option<SubmissionStatus>,
}

/// Contact form
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid fields
/// - `403 Forbidden`: Missing/invalid CAPTCHA or unsafe input
/// - `500 Internal Server Error`: Submission could not be stored
pub async fn submit_contact(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    auth: Option<AuthContext>,
    JsonBody(form): JsonBody<ContactForm>,
) -> ApiResult<Json<FormResponse>> {
    submit(&state, form, ip, auth, "Thanks for getting in touch, we'll reply shortly").await
}

/// Quote request form
pub async fn submit_quote(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    auth: Option<AuthContext>,
    JsonBody(form): JsonBody<QuoteForm>,
) -> ApiResult<Json<FormResponse>> {
    submit(&state, form, ip, auth, "Quote request received, we'll be in touch with an estimate").await
}

/// Demo booking form
pub async fn submit_demo(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    auth: Option<AuthContext>,
    JsonBody(form): JsonBody<DemoForm>,
) -> ApiResult<Json<FormResponse>> {
    submit(&state, form, ip, auth, "Demo request received, we'll confirm a time shortly").await
}

async fn submit<F: IntakeForm>(
    state: &AppState,
    form: F,
    ip_address: Option<std::net::IpAddr>,
    auth: Option<AuthContext>,
    message: &str,
) -> ApiResult<Json<FormResponse>> {
    let ctx = SubmissionContext {
        ip_address,
        user_id: auth.map(|a| a.user_id),
    };
    let receipt = state.intake.submit_form(form, ctx).await?;

    Ok(Json(FormResponse {
        success: true,
        message: message.to_string(),
        submission_id: receipt.submission_id,
        status: receipt.status,
    }))
}

/// Lists submissions, newest first
///
/// # Errors
///
/// - `401 Unauthorized`: No caller
/// - `403 Forbidden`: Caller is not an administrator
pub async fn list_submissions(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<SubmissionQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SubmissionView>>>> {
    auth.require(Permission::ViewSubmissions)?;

    let page = Page::new(query.limit, query.offset);
    let filter = SubmissionFilter {
        form_type: query.form_type,
        status: query.status,
    };

    let submissions = FormSubmission::list(&state.db, &filter, page).await?;
    let total = FormSubmission::count(&state.db, &filter).await?;

    Ok(Json(ApiResponse::list(
        "Submissions retrieved",
        submissions.into_iter().map(SubmissionView::from).collect(),
        total,
        page,
    )))
}

pub async fn get_submission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<SubmissionView>>> {
    auth.require(Permission::ViewSubmissions)?;

    let submission = FormSubmission::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Submission retrieved",
        SubmissionView::from(submission),
    )))
}
