/// Intake pipeline for form submissions and file uploads
///
/// Every submission walks the same stages:
///
/// ```text
/// received → validated → security-checked → persisted → notified → completed
///     │           │              │               │
///     └───────────┴──────────────┴───────────────┴──→ failed
/// ```
///
/// - **validated**: the payload passes its schema, otherwise
///   [`IntakeError::Validation`]. A missing CAPTCHA token is checked first and
///   is a security failure whatever the other fields hold.
/// - **security-checked**: the CAPTCHA token is accepted by the provider and
///   no text field carries script content, otherwise [`IntakeError::Security`]
/// - **persisted**: one insert creates the record. Failure here is fatal and not
///   retried.
/// - **notified**: email and CRM are called in turn. Their failures are logged
///   and recorded in the row's status but never undo the stored record or
///   change the outcome for the caller.
///
/// Resubmitting creates a new record; there is no deduplication.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use brightline_shared::intake::{IntakeService, SubmissionContext};
/// use brightline_shared::intake::forms::ContactForm;
/// use brightline_shared::integrations::Integrations;
/// use brightline_shared::integrations::mock::{CaptchaMode, MockCaptcha, MemoryStorage};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let integrations = Integrations::minimal(
///     Arc::new(MockCaptcha::new(CaptchaMode::Accept)),
///     Arc::new(MemoryStorage::new()),
/// );
/// let intake = IntakeService::new(pool, integrations, 10 * 1024 * 1024);
///
/// let form: ContactForm = serde_json::from_str(r#"{
///     "full_name": "Jane Doe",
///     "email": "jane@example.com",
///     "message": "Hello!",
///     "captcha_token": "token"
/// }"#)?;
///
/// let receipt = intake.submit_form(form, SubmissionContext::default()).await?;
/// println!("stored {}", receipt.submission_id);
/// # Ok(())
/// # }
/// ```

pub mod error;
pub mod forms;

pub use error::{IntakeError, SecurityFailure};

use std::fmt;
use std::net::IpAddr;

use bytes::Bytes;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::integrations::crm::CrmLead;
use crate::integrations::notifier::Notification;
use crate::integrations::storage::upload_key;
use crate::integrations::Integrations;
use crate::models::file_upload::{CreateFileUpload, FileUpload, UploadStatus};
use crate::models::form_submission::{CreateFormSubmission, FormSubmission, SubmissionStatus};
use crate::security::sanitize::{check_upload_type, find_unsafe_input, sanitize_filename};
use crate::validation::FieldErrors;
use forms::IntakeForm;

/// Pipeline stage, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Validated,
    SecurityChecked,
    Persisted,
    Notified,
    Completed,
    Failed,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeStage::Received => "received",
            IntakeStage::Validated => "validated",
            IntakeStage::SecurityChecked => "security_checked",
            IntakeStage::Persisted => "persisted",
            IntakeStage::Notified => "notified",
            IntakeStage::Completed => "completed",
            IntakeStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Request metadata that travels with a submission
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionContext {
    /// Caller address, stored for audit
    pub ip_address: Option<IpAddr>,

    /// Logged-in caller, if any
    pub user_id: Option<Uuid>,
}

/// Result of a stored form submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub submission_id: Uuid,

    /// Final row status: `completed`, or `failed` if a collaborator failed
    pub status: SubmissionStatus,

    pub crm_reference: Option<String>,
}

/// File received from a caller
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: Uuid,

    /// Filename as sent by the client
    pub filename: String,

    /// Content type as sent by the client
    pub content_type: String,

    pub data: Bytes,

    pub captcha_token: Option<String>,

    pub ip_address: Option<IpAddr>,
}

/// Runs submissions through validation, the security gate, persistence and
/// fan-out
#[derive(Debug, Clone)]
pub struct IntakeService {
    pool: SqlitePool,
    integrations: Integrations,
    max_upload_bytes: usize,
}

impl IntakeService {
    pub fn new(pool: SqlitePool, integrations: Integrations, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            integrations,
            max_upload_bytes,
        }
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Processes a contact, quote or demo form
    ///
    /// # Errors
    ///
    /// - [`IntakeError::Security`] for a missing CAPTCHA token, checked before
    ///   anything else
    /// - [`IntakeError::Validation`] with field errors
    /// - [`IntakeError::Security`] for a refused CAPTCHA or unsafe input
    /// - [`IntakeError::Persistence`] if the row could not be inserted
    ///
    /// Collaborator failures after the insert are not errors.
    pub async fn submit_form<F: IntakeForm>(
        &self,
        form: F,
        ctx: SubmissionContext,
    ) -> Result<SubmissionReceipt, IntakeError> {
        let form_type = F::FORM_TYPE;
        info!(%form_type, stage = %IntakeStage::Received, "Form submission received");

        let result = self.process_form(&form, ctx).await;
        if let Err(e) = &result {
            warn!(
                %form_type,
                stage = %IntakeStage::Failed,
                failed_after = %e.stage(),
                error = %e,
                "Form submission rejected"
            );
        }
        result
    }

    async fn process_form<F: IntakeForm>(
        &self,
        form: &F,
        ctx: SubmissionContext,
    ) -> Result<SubmissionReceipt, IntakeError> {
        let form_type = F::FORM_TYPE;

        // received → validated
        let token = require_captcha_token(form.captcha_token())?;
        form.validate().map_err(FieldErrors::from)?;
        info!(%form_type, stage = %IntakeStage::Validated, "Form validated");

        // validated → security-checked
        self.verify_captcha(token, ctx.ip_address).await?;
        for (field, value) in form.text_fields() {
            if let Some(kind) = find_unsafe_input(value) {
                return Err(SecurityFailure::UnsafeInput {
                    field: field.to_string(),
                    kind,
                }
                .into());
            }
        }
        info!(%form_type, stage = %IntakeStage::SecurityChecked, "Security checks passed");

        // security-checked → persisted
        let payload = form.payload();
        let submission = FormSubmission::create(
            &self.pool,
            CreateFormSubmission {
                form_type,
                payload: payload.clone(),
                status: SubmissionStatus::Processing,
                ip_address: ctx.ip_address.map(|ip| ip.to_string()),
                user_id: ctx.user_id,
            },
        )
        .await?;
        let submission_id = submission.id;
        info!(%submission_id, %form_type, stage = %IntakeStage::Persisted, "Submission stored");

        // persisted → notified
        let submitter = form.submitter();
        let mut all_delivered = true;

        let notification = build_notification(&submission, &submitter, &payload);
        if let Err(e) = self.integrations.notifier.notify(&notification).await {
            warn!(%submission_id, error = %e, "Staff notification failed");
            all_delivered = false;
        }

        let lead = CrmLead {
            email: submitter.email.clone(),
            full_name: submitter.full_name.clone(),
            company: submitter.company.clone(),
            phone: submitter.phone.clone(),
            source: form_type.to_string(),
            details: payload,
        };
        let mut crm_reference = None;
        match self.integrations.crm.create_lead(&lead).await {
            Ok(Some(reference)) => {
                if let Err(e) =
                    FormSubmission::set_crm_reference(&self.pool, submission_id, &reference).await
                {
                    error!(%submission_id, error = %e, "Failed to record CRM reference");
                }
                crm_reference = Some(reference);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(%submission_id, error = %e, "CRM sync failed");
                all_delivered = false;
            }
        }
        info!(%submission_id, stage = %IntakeStage::Notified, all_delivered, "Fan-out finished");

        // notified → completed
        let status = if all_delivered {
            SubmissionStatus::Completed
        } else {
            SubmissionStatus::Failed
        };
        if let Err(e) = FormSubmission::update_status(&self.pool, submission_id, status).await {
            error!(%submission_id, error = %e, "Failed to record final submission status");
        }
        info!(
            %submission_id,
            stage = %IntakeStage::Completed,
            status = status.as_str(),
            "Form submission processed"
        );

        Ok(SubmissionReceipt {
            submission_id,
            status,
            crm_reference,
        })
    }

    /// Processes a file upload
    ///
    /// The row is inserted as `uploading` before the bytes are written, then
    /// marked `completed` with its storage key and checksum, or `failed` if
    /// storage refused the bytes.
    ///
    /// # Errors
    ///
    /// - [`IntakeError::Validation`] for a bad filename, empty or oversized
    ///   file, or a disallowed type (reported on the `file` field)
    /// - [`IntakeError::Security`] for CAPTCHA problems
    /// - [`IntakeError::Persistence`] or [`IntakeError::Storage`] afterwards
    pub async fn upload_file(&self, request: UploadRequest) -> Result<FileUpload, IntakeError> {
        let user_id = request.user_id;
        info!(%user_id, stage = %IntakeStage::Received, size = request.data.len(), "Upload received");

        let result = self.process_upload(request).await;
        if let Err(e) = &result {
            warn!(
                %user_id,
                stage = %IntakeStage::Failed,
                failed_after = %e.stage(),
                error = %e,
                "Upload rejected"
            );
        }
        result
    }

    async fn process_upload(&self, request: UploadRequest) -> Result<FileUpload, IntakeError> {
        // received → validated
        let token = require_captcha_token(request.captcha_token.as_deref())?;
        let (filename, content_type) = self.validate_upload(&request)?;
        info!(user_id = %request.user_id, stage = %IntakeStage::Validated, %filename, "Upload validated");

        // validated → security-checked
        self.verify_captcha(token, request.ip_address).await?;
        info!(user_id = %request.user_id, stage = %IntakeStage::SecurityChecked, "Security checks passed");

        // security-checked → persisted
        let upload = FileUpload::create(
            &self.pool,
            CreateFileUpload {
                user_id: request.user_id,
                filename: filename.clone(),
                content_type: content_type.to_string(),
                size_bytes: request.data.len() as i64,
                status: UploadStatus::Uploading,
            },
        )
        .await?;
        let upload_id = upload.id;

        let key = upload_key(request.user_id, upload_id, &filename);
        let checksum = hex::encode(Sha256::digest(&request.data));

        if let Err(e) = self
            .integrations
            .storage
            .put(&key, request.data, content_type)
            .await
        {
            if let Err(db_err) = FileUpload::mark_failed(&self.pool, upload_id).await {
                error!(%upload_id, error = %db_err, "Failed to mark upload as failed");
            }
            return Err(e.into());
        }

        let stored = FileUpload::mark_completed(&self.pool, upload_id, &key, &checksum)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        info!(%upload_id, stage = %IntakeStage::Completed, "Upload stored");

        Ok(stored)
    }

    /// Deletes an upload record and its stored object
    ///
    /// The record goes first; a storage object that cannot be removed is only
    /// logged.
    ///
    /// # Returns
    ///
    /// The deleted record, or None if no upload has this ID
    pub async fn delete_upload(&self, id: Uuid) -> Result<Option<FileUpload>, IntakeError> {
        let Some(upload) = FileUpload::delete(&self.pool, id).await? else {
            return Ok(None);
        };

        if let Some(key) = upload.storage_key.as_deref() {
            if let Err(e) = self.integrations.storage.delete(key).await {
                warn!(upload_id = %id, error = %e, "Failed to delete stored upload object");
            }
        }

        info!(upload_id = %id, "Upload deleted");
        Ok(Some(upload))
    }

    fn validate_upload(&self, request: &UploadRequest) -> Result<(String, &'static str), FieldErrors> {
        let mut errors = FieldErrors::new();

        if request.data.is_empty() {
            errors.add("file", "must not be empty");
        } else if request.data.len() > self.max_upload_bytes {
            errors.add(
                "file",
                format!("must be at most {} bytes", self.max_upload_bytes),
            );
        }

        let Some(filename) = sanitize_filename(&request.filename) else {
            errors.add("file", "filename is missing or invalid");
            return Err(errors);
        };

        match check_upload_type(&filename, &request.content_type) {
            Ok(content_type) => {
                errors.into_result()?;
                Ok((filename, content_type))
            }
            Err(e) => {
                errors.add("file", e.to_string());
                Err(errors)
            }
        }
    }

    /// Fails closed: anything short of an explicit "valid" is a rejection
    async fn verify_captcha(&self, token: &str, ip: Option<IpAddr>) -> Result<(), SecurityFailure> {
        match self.integrations.captcha.verify(token, ip).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SecurityFailure::InvalidCaptcha),
            Err(e) => {
                warn!(error = %e, "CAPTCHA verification unavailable");
                Err(SecurityFailure::CaptchaUnavailable)
            }
        }
    }
}

/// Trimmed CAPTCHA token, or [`SecurityFailure::MissingCaptcha`] if blank
fn require_captcha_token(token: Option<&str>) -> Result<&str, SecurityFailure> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(SecurityFailure::MissingCaptcha),
    }
}

/// Staff email listing every stored field
fn build_notification(
    submission: &FormSubmission,
    submitter: &forms::Submitter,
    payload: &JsonValue,
) -> Notification {
    let mut body = format!(
        "A new {} form was submitted.\n\nSubmission ID: {}\n",
        submission.form_type, submission.id
    );
    if let Some(fields) = payload.as_object() {
        for (key, value) in fields {
            let rendered = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            body.push_str(&format!("{}: {}\n", key, rendered));
        }
    }

    Notification {
        subject: format!(
            "New {} form submission from {}",
            submission.form_type, submitter.full_name
        ),
        body,
        reply_to: Some(submitter.email.clone()),
    }
}
