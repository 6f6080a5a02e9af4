/// Intake pipeline tests
///
/// Runs forms and uploads through [`IntakeService`] against an in-memory
/// database and the recording mocks, checking what gets stored and what the
/// collaborators were asked to do at each stage.

use std::net::IpAddr;
use std::sync::Arc;

use brightline_shared::db::connect_in_memory;
use brightline_shared::intake::{
    forms::{ContactForm, QuoteForm},
    IntakeError, IntakeService, SecurityFailure, SubmissionContext, UploadRequest,
};
use brightline_shared::integrations::{
    mock::{CaptchaMode, MemoryStorage, MockCaptcha, MockCrm, RecordingNotifier},
    Integrations,
};
use brightline_shared::models::{
    file_upload::{FileUpload, UploadStatus},
    form_submission::{FormSubmission, FormType, SubmissionFilter, SubmissionStatus},
    user::{CreateUser, User, UserRole},
};
use bytes::Bytes;
use sqlx::SqlitePool;
use uuid::Uuid;

const MAX_UPLOAD_BYTES: usize = 1024;

struct Harness {
    pool: SqlitePool,
    intake: IntakeService,
    captcha: Arc<MockCaptcha>,
    notifier: Arc<RecordingNotifier>,
    crm: Arc<MockCrm>,
    storage: Arc<MemoryStorage>,
}

impl Harness {
    async fn new() -> Self {
        let pool = connect_in_memory().await.unwrap();
        let captcha = Arc::new(MockCaptcha::new(CaptchaMode::Accept));
        let notifier = Arc::new(RecordingNotifier::new());
        let crm = Arc::new(MockCrm::new());
        let storage = Arc::new(MemoryStorage::new());

        let integrations = Integrations {
            captcha: captcha.clone(),
            notifier: notifier.clone(),
            crm: crm.clone(),
            storage: storage.clone(),
        };

        Self {
            intake: IntakeService::new(pool.clone(), integrations, MAX_UPLOAD_BYTES),
            pool,
            captcha,
            notifier,
            crm,
            storage,
        }
    }

    async fn submission_count(&self) -> i64 {
        FormSubmission::count(&self.pool, &SubmissionFilter::default())
            .await
            .unwrap()
    }

    async fn user(&self) -> User {
        User::create(
            &self.pool,
            CreateUser {
                email: format!("{}@example.com", Uuid::new_v4()),
                password_hash: "hash".to_string(),
                full_name: "Uploader".to_string(),
                company: None,
                role: UserRole::Registered,
            },
        )
        .await
        .unwrap()
    }
}

fn contact() -> ContactForm {
    ContactForm {
        full_name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: None,
        company: Some("Acme".to_string()),
        subject: Some("New site".to_string()),
        message: "We need a new website & a logo".to_string(),
        captcha_token: Some("valid-token".to_string()),
    }
}

fn ctx() -> SubmissionContext {
    SubmissionContext {
        ip_address: Some("203.0.113.7".parse::<IpAddr>().unwrap()),
        user_id: None,
    }
}

fn upload(user_id: Uuid, filename: &str, content_type: &str, data: &'static [u8]) -> UploadRequest {
    UploadRequest {
        user_id,
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        data: Bytes::from_static(data),
        captcha_token: Some("valid-token".to_string()),
        ip_address: None,
    }
}

#[tokio::test]
async fn test_valid_contact_form_is_stored_and_fanned_out() {
    let h = Harness::new().await;

    let receipt = h.intake.submit_form(contact(), ctx()).await.unwrap();
    assert_eq!(receipt.status, SubmissionStatus::Completed);
    assert_eq!(receipt.crm_reference.as_deref(), Some("lead-1"));

    let stored = FormSubmission::find_by_id(&h.pool, receipt.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.form_type, FormType::Contact);
    assert_eq!(stored.status, SubmissionStatus::Completed);
    assert_eq!(stored.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(stored.crm_reference.as_deref(), Some("lead-1"));
    assert_eq!(stored.payload.0["message"], "We need a new website & a logo");
    assert!(stored.payload.0.get("captcha_token").is_none());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New contact form submission from Jane Doe");
    assert_eq!(sent[0].reply_to.as_deref(), Some("jane@example.com"));

    let leads = h.crm.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].source, "contact");

    assert_eq!(h.captcha.tokens(), vec!["valid-token".to_string()]);
}

#[tokio::test]
async fn test_missing_captcha_is_rejected_before_storage() {
    let h = Harness::new().await;
    let form = ContactForm {
        captcha_token: None,
        ..contact()
    };

    let err = h.intake.submit_form(form, ctx()).await.unwrap_err();
    assert!(matches!(err, IntakeError::Security(SecurityFailure::MissingCaptcha)));

    assert_eq!(h.submission_count().await, 0);
    assert!(h.notifier.sent().is_empty());
    assert!(h.crm.leads().is_empty());
    assert!(h.captcha.tokens().is_empty(), "Provider should not be asked");
}

#[tokio::test]
async fn test_rejected_and_unavailable_captcha() {
    let h = Harness::new().await;

    h.captcha.set_mode(CaptchaMode::Reject);
    let err = h.intake.submit_form(contact(), ctx()).await.unwrap_err();
    assert!(matches!(err, IntakeError::Security(SecurityFailure::InvalidCaptcha)));

    h.captcha.set_mode(CaptchaMode::Unavailable);
    let err = h.intake.submit_form(contact(), ctx()).await.unwrap_err();
    assert!(matches!(err, IntakeError::Security(SecurityFailure::CaptchaUnavailable)));

    assert_eq!(h.submission_count().await, 0);
}

#[tokio::test]
async fn test_missing_captcha_wins_over_invalid_fields() {
    let h = Harness::new().await;
    let form = ContactForm {
        email: "not-an-email".to_string(),
        message: String::new(),
        captcha_token: Some("   ".to_string()),
        ..contact()
    };

    let err = h.intake.submit_form(form, ctx()).await.unwrap_err();
    assert!(
        matches!(err, IntakeError::Security(SecurityFailure::MissingCaptcha)),
        "got {err:?}"
    );
    assert_eq!(h.submission_count().await, 0);
}

#[tokio::test]
async fn test_validation_runs_before_captcha_verification() {
    let h = Harness::new().await;
    h.captcha.set_mode(CaptchaMode::Reject);
    let form = ContactForm {
        email: "not-an-email".to_string(),
        ..contact()
    };

    let err = h.intake.submit_form(form, ctx()).await.unwrap_err();
    match err {
        IntakeError::Validation(errors) => {
            assert_eq!(errors.get("email"), Some("must be a valid email address"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(h.captcha.tokens().is_empty(), "Provider should not be asked");
    assert_eq!(h.submission_count().await, 0);
}

#[tokio::test]
async fn test_collaborators_receive_submitted_text() {
    let h = Harness::new().await;
    let form = ContactForm {
        full_name: "Conan O'Brien".to_string(),
        email: "o'brien@example.com".to_string(),
        company: Some("Smith & Sons".to_string()),
        message: "Budget < 10k, \"soon\"".to_string(),
        ..contact()
    };

    let receipt = h.intake.submit_form(form, ctx()).await.unwrap();
    assert_eq!(receipt.status, SubmissionStatus::Completed);

    let leads = h.crm.leads();
    assert_eq!(leads[0].email, "o'brien@example.com");
    assert_eq!(leads[0].full_name, "Conan O'Brien");
    assert_eq!(leads[0].company.as_deref(), Some("Smith & Sons"));
    assert_eq!(leads[0].details["message"], "Budget < 10k, \"soon\"");

    let sent = h.notifier.sent();
    assert_eq!(sent[0].reply_to.as_deref(), Some("o'brien@example.com"));
    assert_eq!(sent[0].subject, "New contact form submission from Conan O'Brien");
    assert!(sent[0].body.contains("company: Smith & Sons"));

    let stored = FormSubmission::find_by_id(&h.pool, receipt.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.payload.0["full_name"], "Conan O'Brien");
    assert_eq!(stored.payload.0["email"], "o'brien@example.com");
}

#[tokio::test]
async fn test_script_content_is_rejected() {
    let h = Harness::new().await;
    let form = ContactForm {
        message: "hello <script>alert(1)</script>".to_string(),
        ..contact()
    };

    let err = h.intake.submit_form(form, ctx()).await.unwrap_err();
    match err {
        IntakeError::Security(SecurityFailure::UnsafeInput { field, .. }) => {
            assert_eq!(field, "message");
        }
        other => panic!("expected unsafe input, got {other:?}"),
    }
    assert_eq!(h.submission_count().await, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_collaborator_failure_keeps_record() {
    let h = Harness::new().await;
    h.notifier.set_failing(true);

    let receipt = h.intake.submit_form(contact(), ctx()).await.unwrap();
    assert_eq!(receipt.status, SubmissionStatus::Failed);

    let stored = FormSubmission::find_by_id(&h.pool, receipt.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubmissionStatus::Failed);
    // CRM still ran
    assert_eq!(h.crm.leads().len(), 1);
}

#[tokio::test]
async fn test_crm_failure_marks_failed() {
    let h = Harness::new().await;
    h.crm.set_failing(true);

    let receipt = h.intake.submit_form(contact(), ctx()).await.unwrap();
    assert_eq!(receipt.status, SubmissionStatus::Failed);
    assert!(receipt.crm_reference.is_none());
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_quote_form_links_user() {
    let h = Harness::new().await;
    let user = h.user().await;
    let form = QuoteForm {
        full_name: "Sam Lee".to_string(),
        email: "sam@example.com".to_string(),
        services: vec!["web-design".to_string()],
        budget_range: "10k-25k".to_string(),
        timeline: Some("asap".to_string()),
        project_description: "A marketing site".to_string(),
        captcha_token: Some("token".to_string()),
        ..Default::default()
    };

    let receipt = h
        .intake
        .submit_form(
            form,
            SubmissionContext {
                ip_address: None,
                user_id: Some(user.id),
            },
        )
        .await
        .unwrap();

    let stored = FormSubmission::find_by_id(&h.pool, receipt.submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.form_type, FormType::Quote);
    assert_eq!(stored.user_id, Some(user.id));
    assert_eq!(stored.payload.0["budget_range"], "10k-25k");
}

#[tokio::test]
async fn test_upload_is_stored_with_checksum() {
    let h = Harness::new().await;
    let user = h.user().await;

    let stored = h
        .intake
        .upload_file(upload(user.id, "../My Brief.txt", "text/plain", b"hello"))
        .await
        .unwrap();

    assert_eq!(stored.status, UploadStatus::Completed);
    assert_eq!(stored.filename, "My_Brief.txt");
    assert_eq!(stored.size_bytes, 5);
    assert_eq!(
        stored.checksum_sha256.as_deref(),
        Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
    );

    let key = stored.storage_key.clone().unwrap();
    assert!(h.storage.contains(&key));
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let h = Harness::new().await;
    let user = h.user().await;

    let err = h
        .intake
        .upload_file(upload(user.id, "empty.txt", "text/plain", b""))
        .await
        .unwrap_err();
    match err {
        IntakeError::Validation(errors) => assert_eq!(errors.get("file"), Some("must not be empty")),
        other => panic!("expected validation error, got {other:?}"),
    }

    static BIG: [u8; MAX_UPLOAD_BYTES + 1] = [b'a'; MAX_UPLOAD_BYTES + 1];
    let err = h
        .intake
        .upload_file(upload(user.id, "big.txt", "text/plain", &BIG))
        .await
        .unwrap_err();
    match err {
        IntakeError::Validation(errors) => {
            assert_eq!(errors.get("file"), Some("must be at most 1024 bytes"))
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = h
        .intake
        .upload_file(upload(user.id, "tool.exe", "application/x-msdownload", b"MZ"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Validation(_)));

    assert_eq!(FileUpload::count(&h.pool, Some(user.id)).await.unwrap(), 0);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_upload_requires_captcha() {
    let h = Harness::new().await;
    let user = h.user().await;

    let request = UploadRequest {
        captcha_token: Some("   ".to_string()),
        ..upload(user.id, "notes.txt", "text/plain", b"notes")
    };
    let err = h.intake.upload_file(request).await.unwrap_err();

    assert!(matches!(err, IntakeError::Security(SecurityFailure::MissingCaptcha)));
    assert_eq!(FileUpload::count(&h.pool, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_storage_failure_marks_upload_failed() {
    let h = Harness::new().await;
    let user = h.user().await;
    h.storage.set_failing(true);

    let err = h
        .intake
        .upload_file(upload(user.id, "notes.txt", "text/plain", b"notes"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Storage(_)));

    let uploads = FileUpload::list(&h.pool, Some(user.id), Default::default())
        .await
        .unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].status, UploadStatus::Failed);
    assert!(uploads[0].storage_key.is_none());
}

#[tokio::test]
async fn test_delete_upload_removes_object() {
    let h = Harness::new().await;
    let user = h.user().await;

    let stored = h
        .intake
        .upload_file(upload(user.id, "notes.txt", "text/plain", b"notes"))
        .await
        .unwrap();
    let key = stored.storage_key.clone().unwrap();

    let deleted = h.intake.delete_upload(stored.id).await.unwrap();
    assert_eq!(deleted.map(|u| u.id), Some(stored.id));
    assert!(!h.storage.contains(&key));

    assert!(h.intake.delete_upload(stored.id).await.unwrap().is_none());
}
