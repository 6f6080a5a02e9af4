/// Database round-trips for the content, intake and account models
///
/// Every test gets its own in-memory database with the full schema.

use brightline_shared::db::connect_in_memory;
use brightline_shared::models::{
    case_study::{CaseStudy, CaseStudyFilter, CaseStudyResult, CreateCaseStudy, CreateCaseStudyResult, UpdateCaseStudy},
    file_upload::{CreateFileUpload, FileAnalysis, FileUpload, UploadStatus},
    form_submission::{CreateFormSubmission, FormSubmission, FormType, SubmissionFilter, SubmissionStatus},
    impact_story::{CreateImpactMetric, CreateImpactStory, ImpactMetric, ImpactStory, ImpactStoryFilter},
    industry::{CreateIndustry, Industry},
    location::{CreateLocation, Location},
    service::{CreateService, CreateServiceFeature, Service, ServiceFeature, UpdateService},
    user::{CreateUser, UpdateUser, User, UserRole},
    Page, StoreError,
};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

fn feature(title: &str, order: Option<i64>) -> CreateServiceFeature {
    CreateServiceFeature {
        title: title.to_string(),
        description: None,
        order,
    }
}

fn service(slug: &str, published: bool) -> CreateService {
    CreateService {
        slug: slug.to_string(),
        title: format!("Service {slug}"),
        summary: "What we do".to_string(),
        description: None,
        icon: None,
        is_published: published,
        display_order: 0,
        features: Vec::new(),
    }
}

async fn industry(pool: &SqlitePool) -> Industry {
    Industry::create(
        pool,
        CreateIndustry {
            slug: "healthcare".to_string(),
            name: "Healthcare".to_string(),
            description: None,
        },
    )
    .await
    .unwrap()
}

fn case_study(slug: &str, industry_id: Uuid) -> CreateCaseStudy {
    CreateCaseStudy {
        slug: slug.to_string(),
        title: "Faster intake".to_string(),
        client_name: "Acme Clinics".to_string(),
        summary: "Cut wait times".to_string(),
        challenge: None,
        solution: None,
        industry_id,
        is_featured: false,
        is_published: true,
        results: Vec::new(),
        service_ids: Vec::new(),
    }
}

async fn user(pool: &SqlitePool, email: &str) -> User {
    User::create(
        pool,
        CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: "Test User".to_string(),
            company: None,
            role: UserRole::Registered,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_service_features_keep_display_order() {
    let pool = connect_in_memory().await.unwrap();

    let mut data = service("web-design", true);
    data.features = vec![
        feature("Launch", Some(2)),
        feature("Audit", Some(0)),
        feature("Build", Some(1)),
        feature("Support", Some(2)),
    ];
    let created = Service::create(&pool, data).await.unwrap();

    let titles: Vec<String> = ServiceFeature::list_for_service(&pool, created.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.title)
        .collect();

    // Equal `order` values keep insertion order
    assert_eq!(titles, vec!["Audit", "Build", "Launch", "Support"]);
}

#[tokio::test]
async fn test_feature_order_defaults_to_position() {
    let pool = connect_in_memory().await.unwrap();

    let mut data = service("seo", true);
    data.features = vec![feature("First", None), feature("Second", None)];
    let created = Service::create(&pool, data).await.unwrap();

    let features = ServiceFeature::list_for_service(&pool, created.id).await.unwrap();
    assert_eq!(features[0].order, 0);
    assert_eq!(features[1].order, 1);
}

#[tokio::test]
async fn test_duplicate_service_slug_is_unique_violation() {
    let pool = connect_in_memory().await.unwrap();

    Service::create(&pool, service("web-design", true)).await.unwrap();
    let err = Service::create(&pool, service("web-design", false))
        .await
        .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
    assert_eq!(Service::count(&pool, false).await.unwrap(), 1);

    let existing = Service::find_by_slug(&pool, "web-design").await.unwrap().unwrap();
    assert_eq!(existing.title, "Service web-design");
    assert!(existing.is_published);
}

#[tokio::test]
async fn test_update_to_taken_slug_is_unique_violation() {
    let pool = connect_in_memory().await.unwrap();

    Service::create(&pool, service("web-design", true)).await.unwrap();
    let other = Service::create(&pool, service("seo", true)).await.unwrap();

    let err = Service::update(
        &pool,
        other.id,
        UpdateService {
            slug: Some("web-design".to_string()),
            title: Some("Renamed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.as_database_error().expect("database error").is_unique_violation());

    let unchanged = Service::find_by_id(&pool, other.id).await.unwrap().unwrap();
    assert_eq!(unchanged.slug, "seo");
    assert_eq!(unchanged.title, "Service seo");
}

#[tokio::test]
async fn test_service_update_replaces_features_and_clears_fields() {
    let pool = connect_in_memory().await.unwrap();

    let mut data = service("branding", true);
    data.icon = Some("star".to_string());
    data.features = vec![feature("Old", None)];
    let created = Service::create(&pool, data).await.unwrap();

    let updated = Service::update(
        &pool,
        created.id,
        UpdateService {
            title: Some("Brand strategy".to_string()),
            icon: Some(None),
            features: Some(vec![feature("New A", None), feature("New B", None)]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.title, "Brand strategy");
    assert_eq!(updated.icon, None);
    assert_eq!(updated.summary, "What we do");

    let features = ServiceFeature::list_for_service(&pool, created.id).await.unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].title, "New A");

    let missing = Service::update(&pool, Uuid::new_v4(), UpdateService::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_service_list_hides_unpublished() {
    let pool = connect_in_memory().await.unwrap();

    Service::create(&pool, service("public", true)).await.unwrap();
    Service::create(&pool, service("draft", false)).await.unwrap();

    let published = Service::list(&pool, true, Page::default()).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].slug, "public");
    assert_eq!(Service::count(&pool, true).await.unwrap(), 1);

    let all = Service::list(&pool, false, Page::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_service_delete_cascades_features() {
    let pool = connect_in_memory().await.unwrap();

    let mut data = service("hosting", true);
    data.features = vec![feature("Backups", None)];
    let created = Service::create(&pool, data).await.unwrap();

    assert!(Service::delete(&pool, created.id).await.unwrap());
    assert!(!Service::delete(&pool, created.id).await.unwrap());

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_features")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_case_study_requires_existing_industry() {
    let pool = connect_in_memory().await.unwrap();
    let missing = Uuid::new_v4();

    let err = CaseStudy::create(&pool, case_study("acme", missing))
        .await
        .unwrap_err();

    match err {
        StoreError::MissingReference { entity, id } => {
            assert_eq!(entity, "industry");
            assert_eq!(id, missing);
        }
        other => panic!("expected missing reference, got {other:?}"),
    }
}

#[tokio::test]
async fn test_case_study_with_results_and_services() {
    let pool = connect_in_memory().await.unwrap();
    let industry = industry(&pool).await;
    let web = Service::create(&pool, service("web-design", true)).await.unwrap();

    let mut data = case_study("acme", industry.id);
    data.results = vec![
        CreateCaseStudyResult {
            metric: "Wait time".to_string(),
            value: "-45%".to_string(),
            description: None,
            order: None,
        },
        CreateCaseStudyResult {
            metric: "Bookings".to_string(),
            value: "+30%".to_string(),
            description: None,
            order: None,
        },
    ];
    // Duplicates are linked once
    data.service_ids = vec![web.id, web.id];
    let study = CaseStudy::create(&pool, data).await.unwrap();

    let results = CaseStudyResult::list_for_case_study(&pool, study.id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metric, "Wait time");

    let services = CaseStudy::services(&pool, study.id).await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, web.id);
}

#[tokio::test]
async fn test_case_study_unknown_service_rolls_back() {
    let pool = connect_in_memory().await.unwrap();
    let industry = industry(&pool).await;

    let mut data = case_study("acme", industry.id);
    data.service_ids = vec![Uuid::new_v4()];
    let err = CaseStudy::create(&pool, data).await.unwrap_err();

    assert!(matches!(err, StoreError::MissingReference { entity: "service", .. }));
    assert!(CaseStudy::find_by_slug(&pool, "acme").await.unwrap().is_none());
}

#[tokio::test]
async fn test_case_study_filters() {
    let pool = connect_in_memory().await.unwrap();
    let industry = industry(&pool).await;

    let mut featured = case_study("featured", industry.id);
    featured.is_featured = true;
    CaseStudy::create(&pool, featured).await.unwrap();

    let mut draft = case_study("draft", industry.id);
    draft.is_published = false;
    CaseStudy::create(&pool, draft).await.unwrap();

    CaseStudy::create(&pool, case_study("plain", industry.id)).await.unwrap();

    let published = CaseStudyFilter::published();
    assert_eq!(CaseStudy::count(&pool, &published).await.unwrap(), 2);

    let featured_only = CaseStudyFilter {
        featured: Some(true),
        ..CaseStudyFilter::published()
    };
    let studies = CaseStudy::list(&pool, &featured_only, Page::default()).await.unwrap();
    assert_eq!(studies.len(), 1);
    assert_eq!(studies[0].slug, "featured");

    let other_industry = CaseStudyFilter {
        industry_id: Some(Uuid::new_v4()),
        ..Default::default()
    };
    assert_eq!(CaseStudy::count(&pool, &other_industry).await.unwrap(), 0);
}

#[tokio::test]
async fn test_case_study_update_checks_new_industry() {
    let pool = connect_in_memory().await.unwrap();
    let industry = industry(&pool).await;
    let study = CaseStudy::create(&pool, case_study("acme", industry.id)).await.unwrap();

    let err = CaseStudy::update(
        &pool,
        study.id,
        UpdateCaseStudy {
            industry_id: Some(Uuid::new_v4()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::MissingReference { entity: "industry", .. }));

    let updated = CaseStudy::update(
        &pool,
        study.id,
        UpdateCaseStudy {
            challenge: Some(Some("Paper forms".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.challenge.as_deref(), Some("Paper forms"));
}

#[tokio::test]
async fn test_industry_in_use_cannot_be_removed() {
    let pool = connect_in_memory().await.unwrap();
    let industry = industry(&pool).await;
    CaseStudy::create(&pool, case_study("acme", industry.id)).await.unwrap();

    let result = sqlx::query("DELETE FROM industries WHERE id = $1")
        .bind(industry.id)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "ON DELETE RESTRICT should block the delete");
}

#[tokio::test]
async fn test_impact_story_with_metrics() {
    let pool = connect_in_memory().await.unwrap();
    let location = Location::create(
        &pool,
        CreateLocation {
            slug: "nairobi".to_string(),
            name: "Nairobi".to_string(),
            region: None,
            country: "Kenya".to_string(),
        },
    )
    .await
    .unwrap();

    let story = ImpactStory::create(
        &pool,
        CreateImpactStory {
            slug: "clean-water".to_string(),
            title: "Clean water".to_string(),
            summary: "Wells for three villages".to_string(),
            body: None,
            location_id: location.id,
            is_featured: true,
            is_published: true,
            metrics: vec![CreateImpactMetric {
                label: "People served".to_string(),
                value: "4,200".to_string(),
                unit: Some("people".to_string()),
                order: None,
            }],
        },
    )
    .await
    .unwrap();

    let metrics = ImpactMetric::list_for_story(&pool, story.id).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].unit.as_deref(), Some("people"));

    let filter = ImpactStoryFilter {
        location_id: Some(location.id),
        ..Default::default()
    };
    assert_eq!(ImpactStory::count(&pool, &filter).await.unwrap(), 1);

    assert!(ImpactStory::delete(&pool, story.id).await.unwrap());
    assert!(ImpactMetric::list_for_story(&pool, story.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_email_is_case_insensitive_and_unique() {
    let pool = connect_in_memory().await.unwrap();
    let created = user(&pool, "jane@example.com").await;

    let found = User::find_by_email(&pool, "JANE@Example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(created.id));

    let duplicate = User::create(
        &pool,
        CreateUser {
            email: "Jane@example.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Other".to_string(),
            company: None,
            role: UserRole::Registered,
        },
    )
    .await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_user_update_role_and_company() {
    let pool = connect_in_memory().await.unwrap();
    let created = user(&pool, "editor@example.com").await;

    let updated = User::update(
        &pool,
        created.id,
        UpdateUser {
            role: Some(UserRole::ContentEditor),
            company: Some(Some("Brightline".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.role, UserRole::ContentEditor);
    assert_eq!(updated.company.as_deref(), Some("Brightline"));
    assert!(updated.is_active);
}

#[tokio::test]
async fn test_submission_status_and_filter() {
    let pool = connect_in_memory().await.unwrap();

    let submission = FormSubmission::create(
        &pool,
        CreateFormSubmission {
            form_type: FormType::Quote,
            payload: json!({"full_name": "Jane"}),
            status: SubmissionStatus::Processing,
            ip_address: Some("203.0.113.9".to_string()),
            user_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(submission.payload.0["full_name"], "Jane");

    assert!(FormSubmission::update_status(&pool, submission.id, SubmissionStatus::Completed)
        .await
        .unwrap());
    assert!(FormSubmission::set_crm_reference(&pool, submission.id, "lead-7")
        .await
        .unwrap());

    let stored = FormSubmission::find_by_id(&pool, submission.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Completed);
    assert_eq!(stored.crm_reference.as_deref(), Some("lead-7"));

    let contact_only = SubmissionFilter {
        form_type: Some(FormType::Contact),
        status: None,
    };
    assert_eq!(FormSubmission::count(&pool, &contact_only).await.unwrap(), 0);
    assert_eq!(
        FormSubmission::count(&pool, &SubmissionFilter::default()).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_upload_lifecycle_and_analysis() {
    let pool = connect_in_memory().await.unwrap();
    let owner = user(&pool, "owner@example.com").await;

    let upload = FileUpload::create(
        &pool,
        CreateFileUpload {
            user_id: owner.id,
            filename: "brief.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 512,
            status: UploadStatus::Uploading,
        },
    )
    .await
    .unwrap();
    assert_eq!(upload.status, UploadStatus::Uploading);
    assert!(upload.storage_key.is_none());

    let stored = FileUpload::mark_completed(&pool, upload.id, "uploads/key", "abc123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, UploadStatus::Completed);
    assert_eq!(stored.checksum_sha256.as_deref(), Some("abc123"));

    let first = FileAnalysis::upsert(&pool, upload.id, "Draft", json!({"pages": 2}))
        .await
        .unwrap();
    let second = FileAnalysis::upsert(&pool, upload.id, "Final", json!({"pages": 3}))
        .await
        .unwrap();
    assert_eq!(first.id, second.id, "Upsert should keep one analysis per upload");
    assert_eq!(second.summary, "Final");

    assert_eq!(FileUpload::count(&pool, Some(owner.id)).await.unwrap(), 1);
    assert_eq!(FileUpload::count(&pool, Some(Uuid::new_v4())).await.unwrap(), 0);
    assert_eq!(FileUpload::count(&pool, None).await.unwrap(), 1);

    let deleted = FileUpload::delete(&pool, upload.id).await.unwrap();
    assert_eq!(deleted.map(|u| u.id), Some(upload.id));
    assert!(FileAnalysis::find_for_upload(&pool, upload.id).await.unwrap().is_none());
}
