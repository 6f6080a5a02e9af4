/// File upload endpoints
///
/// # Endpoints
///
/// - `POST /v1/uploads` - Multipart upload (`file`, `captcha_token`)
/// - `GET /v1/uploads` - Own uploads; administrators see everyone's
/// - `GET /v1/uploads/:id` - One upload (`?include=analysis`)
/// - `DELETE /v1/uploads/:id` - Delete upload and its stored bytes
/// - `PUT /v1/uploads/:id/analysis` - Attach or replace an analysis (content editor)
///
/// Only the owner and administrators can see or delete an upload.
///
/// # Example
///
/// ```text
/// POST /v1/uploads
/// Authorization: Bearer <token>
/// Content-Type: multipart/form-data; boundary=X
///
/// --X
/// Content-Disposition: form-data; name="captcha_token"
///
/// 03AGdBq2…
/// --X
/// Content-Disposition: form-data; name="file"; filename="brief.pdf"
/// Content-Type: application/pdf
///
/// %PDF-1.7 …
/// --X--
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ClientIp, Includes, QueryParams, ValidatedJson},
    middleware::auth::AuthContext,
    presentation::{upload_view, AnalysisView, ApiResponse, Deleted, UploadView, UPLOAD_INCLUDES},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use brightline_shared::{
    auth::authorization::{require_owner_or_admin, Permission},
    intake::UploadRequest,
    models::{
        file_upload::{FileAnalysis, FileUpload},
        user::UserRole,
        Page,
    },
    validation::validate_not_blank,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// List/detail query
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include: Option<String>,
}

/// Analysis attached to an upload
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 5000, message = "must be at most 5000 characters")
    )]
    pub summary: String,

    /// Free-form structured findings
    pub details: Option<JsonValue>,
}

/// Fields read from the multipart body
#[derive(Debug, Default)]
struct UploadParts {
    filename: Option<String>,
    content_type: Option<String>,
    data: Option<Bytes>,
    captcha_token: Option<String>,
}

/// Uploads one file
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing, empty, oversized or disallowed file
/// - `403 Forbidden`: Missing or invalid CAPTCHA
/// - `500 Internal Server Error`: Storage failed; the row is kept as `failed`
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthContext,
    ClientIp(ip): ClientIp,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<UploadView>>)> {
    auth.require(Permission::UploadFiles)?;

    let max_bytes = state.intake.max_upload_bytes();
    let parts = read_parts(multipart, max_bytes).await?;
    let data = parts
        .data
        .ok_or_else(|| ApiError::field("file", "is required"))?;

    let upload = state
        .intake
        .upload_file(UploadRequest {
            user_id: auth.user_id,
            filename: parts.filename.unwrap_or_default(),
            content_type: parts
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data,
            captcha_token: parts.captcha_token,
            ip_address: ip,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("File uploaded", UploadView::from(upload))),
    ))
}

async fn read_parts(mut multipart: Multipart, max_bytes: usize) -> Result<UploadParts, ApiError> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                parts.filename = field.file_name().map(str::to_string);
                parts.content_type = field.content_type().map(str::to_string);
                parts.data = Some(field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?);
            }
            "captcha_token" => {
                parts.captcha_token =
                    Some(field.text().await.map_err(|e| multipart_error(e, max_bytes))?);
            }
            // Unknown fields are drained and ignored
            _ => {
                field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
            }
        }
    }

    Ok(parts)
}

fn multipart_error(error: MultipartError, max_bytes: usize) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::field("file", format!("must be at most {} bytes", max_bytes))
    } else {
        ApiError::field("body", error.body_text())
    }
}

/// Lists uploads, newest first
pub async fn list_uploads(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<UploadQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UploadView>>>> {
    let includes = Includes::parse(query.include.as_deref(), UPLOAD_INCLUDES)?;
    let page = Page::new(query.limit, query.offset);
    let owner = if auth.role == UserRole::Administrator {
        None
    } else {
        Some(auth.user_id)
    };

    let uploads = FileUpload::list(&state.db, owner, page).await?;
    let total = FileUpload::count(&state.db, owner).await?;

    let mut views = Vec::with_capacity(uploads.len());
    for upload in uploads {
        views.push(upload_view(&state.db, upload, &includes).await?);
    }

    Ok(Json(ApiResponse::list("Uploads retrieved", views, total, page)))
}

/// Gets one upload
///
/// # Errors
///
/// - `403 Forbidden`: Caller neither owns the upload nor is an administrator
/// - `404 Not Found`: No such upload
pub async fn get_upload(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    QueryParams(query): QueryParams<UploadQuery>,
) -> ApiResult<Json<ApiResponse<UploadView>>> {
    let includes = Includes::parse(query.include.as_deref(), UPLOAD_INCLUDES)?;
    let upload = find_owned(&state, &auth, id).await?;

    let view = upload_view(&state.db, upload, &includes).await?;
    Ok(Json(ApiResponse::ok("Upload retrieved", view)))
}

/// Deletes an upload, its analysis and its stored bytes
pub async fn delete_upload(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    find_owned(&state, &auth, id).await?;

    state
        .intake
        .delete_upload(id)
        .await?
        .ok_or_else(upload_not_found)?;
    info!(upload_id = %id, deleted_by = %auth.user_id, "Upload deleted");

    Ok(Json(ApiResponse::ok("Upload deleted", Deleted { id })))
}

/// Attaches an analysis to an upload, replacing any previous one
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a content editor
/// - `404 Not Found`: No such upload
pub async fn put_analysis(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AnalysisRequest>,
) -> ApiResult<Json<ApiResponse<AnalysisView>>> {
    auth.require(Permission::ManageContent)?;

    FileUpload::find_by_id(&state.db, id)
        .await?
        .ok_or_else(upload_not_found)?;

    let details = req.details.unwrap_or_else(|| json!({}));
    let analysis = FileAnalysis::upsert(&state.db, id, req.summary.trim(), details).await?;
    info!(upload_id = %id, analysis_id = %analysis.id, "Upload analysis saved");

    Ok(Json(ApiResponse::ok(
        "Analysis saved",
        AnalysisView::from(analysis),
    )))
}

async fn find_owned(state: &AppState, auth: &AuthContext, id: Uuid) -> Result<FileUpload, ApiError> {
    let upload = FileUpload::find_by_id(&state.db, id)
        .await?
        .ok_or_else(upload_not_found)?;

    require_owner_or_admin(auth.role, auth.user_id, upload.user_id)?;
    Ok(upload)
}

fn upload_not_found() -> ApiError {
    ApiError::NotFound("Upload not found".to_string())
}
