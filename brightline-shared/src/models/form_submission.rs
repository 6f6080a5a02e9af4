/// Form submission model
///
/// Each contact, quote or demo request is stored as one row with its validated
/// fields kept as an opaque JSON payload. Rows are never deleted; the intake
/// pipeline moves them through [`SubmissionStatus`] as collaborators respond.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE form_submissions (
///     id BLOB PRIMARY KEY NOT NULL,
///     form_type TEXT NOT NULL,            -- contact | quote | demo
///     payload TEXT NOT NULL,              -- JSON object
///     status TEXT NOT NULL DEFAULT 'pending',
///     ip_address TEXT,
///     user_id BLOB REFERENCES users(id) ON DELETE SET NULL,
///     crm_reference TEXT,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::Page;

/// Kind of form a visitor submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Contact,
    Quote,
    Demo,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Contact => "contact",
            FormType::Quote => "quote",
            FormType::Demo => "demo",
        }
    }
}

impl std::fmt::Display for FormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a stored submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Stored, fan-out not started
    Pending,

    /// Notification and CRM fan-out in progress
    Processing,

    /// Every collaborator accepted the submission
    Completed,

    /// At least one collaborator failed; the record itself is intact
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        }
    }
}

/// Stored form submission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_type: FormType,
    /// Validated form fields, trimmed and without control characters
    pub payload: Json<JsonValue>,
    pub status: SubmissionStatus,
    /// Submitter address as seen by the API, if known
    pub ip_address: Option<String>,
    /// Account that submitted the form, if the caller was logged in
    pub user_id: Option<Uuid>,
    /// Identifier assigned by the CRM
    pub crm_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new submission
#[derive(Debug, Clone)]
pub struct CreateFormSubmission {
    pub form_type: FormType,
    pub payload: JsonValue,
    pub status: SubmissionStatus,
    pub ip_address: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Filter for [`FormSubmission::list`]
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub form_type: Option<FormType>,
    pub status: Option<SubmissionStatus>,
}

impl SubmissionFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(form_type) = self.form_type {
            qb.push(" AND form_type = ").push_bind(form_type);
        }
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
    }
}

const SUBMISSION_COLUMNS: &str = "id, form_type, payload, status, ip_address, user_id, \
                                  crm_reference, created_at, updated_at";

impl FormSubmission {
    /// Inserts a submission row
    pub async fn create(pool: &SqlitePool, data: CreateFormSubmission) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FormSubmission>(&format!(
            r#"
            INSERT INTO form_submissions (id, form_type, payload, status, ip_address, user_id,
                                          created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.form_type)
        .bind(Json(data.payload))
        .bind(data.status)
        .bind(data.ip_address)
        .bind(data.user_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FormSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Moves a submission to a new status
    ///
    /// # Returns
    ///
    /// True if the row exists
    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE form_submissions SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records the identifier the CRM assigned to this submission
    pub async fn set_crm_reference(
        pool: &SqlitePool,
        id: Uuid,
        crm_reference: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE form_submissions SET crm_reference = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(crm_reference)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists submissions, newest first
    pub async fn list(
        pool: &SqlitePool,
        filter: &SubmissionFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SUBMISSION_COLUMNS} FROM form_submissions"
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as::<FormSubmission>().fetch_all(pool).await
    }

    pub async fn count(pool: &SqlitePool, filter: &SubmissionFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM form_submissions");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }
}
