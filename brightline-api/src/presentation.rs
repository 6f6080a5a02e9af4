/// Response payloads
///
/// Every entity is mapped to a view before it leaves the API. Views drop
/// internal columns (password hashes, storage keys) and carry relationships
/// only when the caller asked for them through `include`, so a case study
/// never drags in its services' case studies and so on.
///
/// Successful responses are wrapped in [`ApiResponse`]:
///
/// ```json
/// {
///   "success": true,
///   "message": "Service created",
///   "data": { "id": "…", "slug": "web-design", "…": "…" }
/// }
/// ```
///
/// Lists add a `pagination` object with `total`, `limit` and `offset`.

use crate::extract::Includes;
use brightline_shared::models::{
    case_study::{CaseStudy, CaseStudyResult},
    file_upload::{FileAnalysis, FileUpload, UploadStatus},
    form_submission::{FormSubmission, FormType, SubmissionStatus},
    impact_story::{ImpactMetric, ImpactStory},
    industry::Industry,
    location::Location,
    service::{Service, ServiceFeature},
    user::{User, UserRole},
    Page,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Allowed `include` names per resource
pub const SERVICE_INCLUDES: &[&str] = &["features"];
pub const CASE_STUDY_INCLUDES: &[&str] = &["industry", "results", "services"];
pub const IMPACT_STORY_INCLUDES: &[&str] = &["location", "metrics"];
pub const UPLOAD_INCLUDES: &[&str] = &["analysis"];

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Position of a list page within the full result
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            pagination: None,
        }
    }

    pub fn list(message: impl Into<String>, data: T, total: i64, page: Page) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            pagination: Some(Pagination {
                total,
                limit: page.limit,
                offset: page.offset,
            }),
        }
    }
}

/// Body of a successful delete
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Account as shown to its owner and administrators
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub role: UserRole,
    pub crm_contact_id: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            company: user.company,
            role: user.role,
            crm_contact_id: user.crm_contact_id,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ServiceFeature> for FeatureView {
    fn from(feature: ServiceFeature) -> Self {
        Self {
            id: feature.id,
            title: feature.title,
            description: feature.description,
            order: feature.order,
            created_at: feature.created_at,
            updated_at: feature.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_published: bool,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<FeatureView>>,
}

impl From<Service> for ServiceView {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            slug: service.slug,
            title: service.title,
            summary: service.summary,
            description: service.description,
            icon: service.icon,
            is_published: service.is_published,
            display_order: service.display_order,
            created_at: service.created_at,
            updated_at: service.updated_at,
            features: None,
        }
    }
}

/// Builds a service view, loading features when requested
pub async fn service_view(
    pool: &SqlitePool,
    service: Service,
    includes: &Includes,
) -> Result<ServiceView, sqlx::Error> {
    let features = if includes.has("features") {
        let features = ServiceFeature::list_for_service(pool, service.id).await?;
        Some(features.into_iter().map(FeatureView::from).collect())
    } else {
        None
    };

    Ok(ServiceView {
        features,
        ..ServiceView::from(service)
    })
}

#[derive(Debug, Serialize)]
pub struct CaseStudyResultView {
    pub id: Uuid,
    pub metric: String,
    pub value: String,
    pub description: Option<String>,
    pub order: i64,
}

impl From<CaseStudyResult> for CaseStudyResultView {
    fn from(result: CaseStudyResult) -> Self {
        Self {
            id: result.id,
            metric: result.metric,
            value: result.value,
            description: result.description,
            order: result.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaseStudyView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub client_name: String,
    pub summary: String,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub industry_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CaseStudyResultView>>,
    /// Linked services, without their own relationships
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceView>>,
}

/// Builds a case study view with the requested relationships
pub async fn case_study_view(
    pool: &SqlitePool,
    study: CaseStudy,
    includes: &Includes,
) -> Result<CaseStudyView, sqlx::Error> {
    let industry = if includes.has("industry") {
        Industry::find_by_id(pool, study.industry_id).await?
    } else {
        None
    };

    let results = if includes.has("results") {
        let results = CaseStudyResult::list_for_case_study(pool, study.id).await?;
        Some(results.into_iter().map(CaseStudyResultView::from).collect())
    } else {
        None
    };

    let services = if includes.has("services") {
        let services = CaseStudy::services(pool, study.id).await?;
        Some(services.into_iter().map(ServiceView::from).collect())
    } else {
        None
    };

    Ok(CaseStudyView {
        id: study.id,
        slug: study.slug,
        title: study.title,
        client_name: study.client_name,
        summary: study.summary,
        challenge: study.challenge,
        solution: study.solution,
        industry_id: study.industry_id,
        is_featured: study.is_featured,
        is_published: study.is_published,
        created_at: study.created_at,
        updated_at: study.updated_at,
        industry,
        results,
        services,
    })
}

#[derive(Debug, Serialize)]
pub struct ImpactMetricView {
    pub id: Uuid,
    pub label: String,
    pub value: String,
    pub unit: Option<String>,
    pub order: i64,
}

impl From<ImpactMetric> for ImpactMetricView {
    fn from(metric: ImpactMetric) -> Self {
        Self {
            id: metric.id,
            label: metric.label,
            value: metric.value,
            unit: metric.unit,
            order: metric.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImpactStoryView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: Option<String>,
    pub location_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<ImpactMetricView>>,
}

/// Builds an impact story view with the requested relationships
pub async fn impact_story_view(
    pool: &SqlitePool,
    story: ImpactStory,
    includes: &Includes,
) -> Result<ImpactStoryView, sqlx::Error> {
    let location = if includes.has("location") {
        Location::find_by_id(pool, story.location_id).await?
    } else {
        None
    };

    let metrics = if includes.has("metrics") {
        let metrics = ImpactMetric::list_for_story(pool, story.id).await?;
        Some(metrics.into_iter().map(ImpactMetricView::from).collect())
    } else {
        None
    };

    Ok(ImpactStoryView {
        id: story.id,
        slug: story.slug,
        title: story.title,
        summary: story.summary,
        body: story.body,
        location_id: story.location_id,
        is_featured: story.is_featured,
        is_published: story.is_published,
        created_at: story.created_at,
        updated_at: story.updated_at,
        location,
        metrics,
    })
}

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    pub id: Uuid,
    pub form_type: FormType,
    pub payload: JsonValue,
    pub status: SubmissionStatus,
    pub ip_address: Option<String>,
    pub user_id: Option<Uuid>,
    pub crm_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FormSubmission> for SubmissionView {
    fn from(submission: FormSubmission) -> Self {
        Self {
            id: submission.id,
            form_type: submission.form_type,
            payload: submission.payload.0,
            status: submission.status,
            ip_address: submission.ip_address,
            user_id: submission.user_id,
            crm_reference: submission.crm_reference,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisView {
    pub id: Uuid,
    pub summary: String,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileAnalysis> for AnalysisView {
    fn from(analysis: FileAnalysis) -> Self {
        Self {
            id: analysis.id,
            summary: analysis.summary,
            details: analysis.details.0,
            created_at: analysis.created_at,
            updated_at: analysis.updated_at,
        }
    }
}

/// Upload metadata; the storage key stays internal
#[derive(Debug, Serialize)]
pub struct UploadView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: Option<String>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisView>,
}

impl From<FileUpload> for UploadView {
    fn from(upload: FileUpload) -> Self {
        Self {
            id: upload.id,
            user_id: upload.user_id,
            filename: upload.filename,
            content_type: upload.content_type,
            size_bytes: upload.size_bytes,
            checksum_sha256: upload.checksum_sha256,
            status: upload.status,
            created_at: upload.created_at,
            updated_at: upload.updated_at,
            analysis: None,
        }
    }
}

/// Builds an upload view, loading the analysis when requested
pub async fn upload_view(
    pool: &SqlitePool,
    upload: FileUpload,
    includes: &Includes,
) -> Result<UploadView, sqlx::Error> {
    let analysis = if includes.has("analysis") {
        FileAnalysis::find_for_upload(pool, upload.id)
            .await?
            .map(AnalysisView::from)
    } else {
        None
    };

    Ok(UploadView {
        analysis,
        ..UploadView::from(upload)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> FileUpload {
        let now = Utc::now();
        FileUpload {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: "brief.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 12,
            checksum_sha256: Some("ab".repeat(32)),
            storage_key: Some("uploads/secret/brief.pdf".to_string()),
            status: UploadStatus::Completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upload_view_hides_storage_key() {
        let json = serde_json::to_value(UploadView::from(upload())).unwrap();
        assert!(json.get("storage_key").is_none());
        assert!(json.get("analysis").is_none());
        assert_eq!(json["filename"], "brief.pdf");
    }

    #[test]
    fn test_user_view_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "Jane".to_string(),
            company: None,
            role: UserRole::Registered,
            crm_contact_id: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&UserView::from(user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_list_envelope() {
        let page = Page::new(Some(5), Some(10));
        let json = serde_json::to_value(ApiResponse::list("ok", vec![1, 2], 12, page)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pagination"]["total"], 12);
        assert_eq!(json["pagination"]["limit"], 5);
        assert_eq!(json["pagination"]["offset"], 10);
    }
}
