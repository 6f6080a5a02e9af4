/// Form intake API tests
///
/// Contact, quote and demo submissions through the HTTP layer, plus the
/// administrator submission review endpoints.

mod common;

use axum::http::StatusCode;
use brightline_shared::integrations::mock::CaptchaMode;
use brightline_shared::models::form_submission::{FormSubmission, SubmissionFilter};
use common::{assert_field_error, TestContext};
use serde_json::{json, Value};

fn contact() -> Value {
    json!({
        "full_name": "Jane Doe",
        "email": "jane@example.com",
        "company": "Acme",
        "message": "We'd like a new website",
        "captcha_token": "token-123"
    })
}

async fn stored_count(ctx: &TestContext) -> i64 {
    FormSubmission::count(&ctx.db, &SubmissionFilter::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_contact_form_success() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.post("/v1/forms/contact", None, contact()).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert!(body["submission_id"].is_string());

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New contact form submission from Jane Doe");
    assert_eq!(ctx.crm.leads().len(), 1);

    let (status, body) = ctx
        .get(
            &format!("/v1/forms/submissions/{}", body["submission_id"].as_str().unwrap()),
            ctx.admin_token(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ip_address"], "203.0.113.10");
    assert_eq!(body["data"]["crm_reference"], "lead-1");
    assert!(body["data"]["user_id"].is_null());
    assert_eq!(body["data"]["payload"]["message"], "We'd like a new website");
}

#[tokio::test]
async fn test_submitted_text_reaches_collaborators_as_sent() {
    let ctx = TestContext::new().await.unwrap();
    let mut form = contact();
    form["full_name"] = json!("Conan O'Brien");
    form["email"] = json!("o'brien@example.com");
    form["company"] = json!("Smith & Sons");

    let (status, body) = ctx.post("/v1/forms/contact", None, form).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let lead = &ctx.crm.leads()[0];
    assert_eq!(lead.email, "o'brien@example.com");
    assert_eq!(lead.full_name, "Conan O'Brien");
    assert_eq!(lead.company.as_deref(), Some("Smith & Sons"));

    let sent = &ctx.notifier.sent()[0];
    assert_eq!(sent.reply_to.as_deref(), Some("o'brien@example.com"));
    assert_eq!(sent.subject, "New contact form submission from Conan O'Brien");
}

#[tokio::test]
async fn test_signed_in_submitter_is_linked() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.post("/v1/forms/contact", ctx.member_token(), contact()).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let (_, body) = ctx.get("/v1/forms/submissions", ctx.admin_token()).await;
    assert_eq!(body["data"][0]["user_id"], ctx.member.id().to_string());
}

#[tokio::test]
async fn test_captcha_failures_store_nothing() {
    let ctx = TestContext::new().await.unwrap();

    let mut form = contact();
    form.as_object_mut().unwrap().remove("captcha_token");
    let (status, body) = ctx.post("/v1/forms/contact", None, form).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "security_error");
    assert_eq!(body["message"], "CAPTCHA token is required");

    // Still a security failure when the other fields are invalid too
    let (status, body) = ctx
        .post(
            "/v1/forms/contact",
            None,
            json!({ "full_name": "", "email": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "security_error");
    assert!(body.get("errors").is_none());

    ctx.captcha.set_mode(CaptchaMode::Reject);
    let (status, body) = ctx.post("/v1/forms/contact", None, contact()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "CAPTCHA verification failed");

    ctx.captcha.set_mode(CaptchaMode::Unavailable);
    let (status, _) = ctx.post("/v1/forms/contact", None, contact()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(stored_count(&ctx).await, 0);
    assert!(ctx.notifier.sent().is_empty());
    assert_eq!(
        ctx.captcha.tokens(),
        vec!["token-123".to_string(), "token-123".to_string()]
    );
}

#[tokio::test]
async fn test_script_injection_is_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let mut form = contact();
    form["company"] = json!("<script>alert('x')</script>");
    let (status, body) = ctx.post("/v1/forms/contact", None, form).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "security_error");
    assert_eq!(stored_count(&ctx).await, 0);
}

#[tokio::test]
async fn test_contact_validation() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .post(
            "/v1/forms/contact",
            None,
            json!({ "full_name": "", "email": "nope", "message": "hi", "captcha_token": "t" }),
        )
        .await;

    assert_field_error(status, &body, "full_name");
    assert_field_error(status, &body, "email");
    assert!(body["errors"].get("message").is_none());
    assert_eq!(stored_count(&ctx).await, 0);
}

#[tokio::test]
async fn test_notifier_failure_still_succeeds() {
    let ctx = TestContext::new().await.unwrap();
    ctx.notifier.set_failing(true);

    let (status, body) = ctx.post("/v1/forms/contact", None, contact()).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "failed");
    assert_eq!(stored_count(&ctx).await, 1);
}

#[tokio::test]
async fn test_quote_form() {
    let ctx = TestContext::new().await.unwrap();
    let quote = json!({
        "full_name": "Sam Lee",
        "email": "sam@example.com",
        "services": ["web-design", "seo"],
        "budget_range": "25k-50k",
        "timeline": "1-3-months",
        "project_description": "Rebuild our marketing site",
        "captcha_token": "t"
    });

    let (status, body) = ctx.post("/v1/forms/quote", None, quote.clone()).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(ctx.crm.leads()[0].source, "quote");

    let mut bad = quote;
    bad["budget_range"] = json!("a lot");
    bad["timeline"] = json!("someday");
    let (status, body) = ctx.post("/v1/forms/quote", None, bad).await;
    assert_field_error(status, &body, "budget_range");
    assert_field_error(status, &body, "timeline");
}

#[tokio::test]
async fn test_demo_form() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .post(
            "/v1/forms/demo",
            None,
            json!({
                "full_name": "Alex Kim",
                "email": "alex@example.com",
                "company": "Globex",
                "team_size": "11-50",
                "preferred_date": "2030-03-15",
                "captcha_token": "t"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let (status, body) = ctx
        .post(
            "/v1/forms/demo",
            None,
            json!({ "full_name": "Alex Kim", "email": "alex@example.com", "captcha_token": "t" }),
        )
        .await;
    assert_field_error(status, &body, "company");
    assert_field_error(status, &body, "team_size");

    let (status, body) = ctx
        .post(
            "/v1/forms/demo",
            None,
            json!({
                "full_name": "Alex Kim",
                "email": "alex@example.com",
                "company": "Globex",
                "team_size": "11-50",
                "preferred_date": "15/03/2030",
                "captcha_token": "t"
            }),
        )
        .await;
    assert_field_error(status, &body, "preferred_date");
    assert!(body["errors"].get("body").is_none());
}

#[tokio::test]
async fn test_submission_review_is_admin_only() {
    let ctx = TestContext::new().await.unwrap();
    ctx.post("/v1/forms/contact", None, contact()).await;
    ctx.notifier.set_failing(true);
    ctx.post("/v1/forms/contact", None, contact()).await;

    let (status, _) = ctx.get("/v1/forms/submissions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/v1/forms/submissions", ctx.editor_token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.get("/v1/forms/submissions", ctx.admin_token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = ctx
        .get("/v1/forms/submissions?status=failed&form_type=contact", ctx.admin_token())
        .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["status"], "failed");

    let (status, body) = ctx
        .get("/v1/forms/submissions?status=archived", ctx.admin_token())
        .await;
    assert_field_error(status, &body, "query");

    let (status, _) = ctx
        .get(
            &format!("/v1/forms/submissions/{}", uuid::Uuid::new_v4()),
            ctx.admin_token(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
