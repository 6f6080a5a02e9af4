/// File upload and file analysis models
///
/// An upload row is created before the bytes are stored and tracks the
/// transfer through [`UploadStatus`]. The bytes themselves live in object
/// storage under `storage_key`. Each upload has at most one [`FileAnalysis`],
/// deleted together with the upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::Page;

/// Upload lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }
}

/// Uploaded file metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileUpload {
    pub id: Uuid,
    /// Owner of the file
    pub user_id: Uuid,
    /// Sanitized original filename
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Hex-encoded SHA-256 of the stored bytes, set on completion
    pub checksum_sha256: Option<String>,
    /// Object storage location, set on completion. Internal only.
    pub storage_key: Option<String>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering an upload before its bytes are stored
#[derive(Debug, Clone)]
pub struct CreateFileUpload {
    pub user_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: UploadStatus,
}

/// Analysis attached to an upload
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileAnalysis {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub summary: String,
    /// Structured analysis output
    pub details: Json<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const UPLOAD_COLUMNS: &str = "id, user_id, filename, content_type, size_bytes, checksum_sha256, \
                              storage_key, status, created_at, updated_at";

impl FileUpload {
    /// Inserts an upload row
    pub async fn create(pool: &SqlitePool, data: CreateFileUpload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            r#"
            INSERT INTO file_uploads (id, user_id, filename, content_type, size_bytes, status,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {UPLOAD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.filename)
        .bind(data.content_type)
        .bind(data.size_bytes)
        .bind(data.status)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM file_uploads WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Marks an upload as stored
    pub async fn mark_completed(
        pool: &SqlitePool,
        id: Uuid,
        storage_key: &str,
        checksum_sha256: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            r#"
            UPDATE file_uploads
            SET status = $2, storage_key = $3, checksum_sha256 = $4, updated_at = $5
            WHERE id = $1
            RETURNING {UPLOAD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(UploadStatus::Completed)
        .bind(storage_key)
        .bind(checksum_sha256)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Marks an upload as failed
    pub async fn mark_failed(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE file_uploads SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(UploadStatus::Failed)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists uploads newest first; `user_id = None` lists every user's uploads
    pub async fn list(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            r#"
            SELECT {UPLOAD_COLUMNS} FROM file_uploads
            WHERE ($1 IS NULL OR user_id = $1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool, user_id: Option<Uuid>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM file_uploads WHERE ($1 IS NULL OR user_id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Deletes an upload and its analysis
    ///
    /// # Returns
    ///
    /// The deleted row, so the caller can remove the stored bytes
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileUpload>(&format!(
            "DELETE FROM file_uploads WHERE id = $1 RETURNING {UPLOAD_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

impl FileAnalysis {
    /// Creates or replaces the analysis of an upload
    pub async fn upsert(
        pool: &SqlitePool,
        upload_id: Uuid,
        summary: &str,
        details: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FileAnalysis>(
            r#"
            INSERT INTO file_analyses (id, upload_id, summary, details, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (upload_id) DO UPDATE
            SET summary = excluded.summary,
                details = excluded.details,
                updated_at = excluded.updated_at
            RETURNING id, upload_id, summary, details, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upload_id)
        .bind(summary)
        .bind(Json(details))
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_for_upload(
        pool: &SqlitePool,
        upload_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileAnalysis>(
            r#"
            SELECT id, upload_id, summary, details, created_at, updated_at
            FROM file_analyses WHERE upload_id = $1
            "#,
        )
        .bind(upload_id)
        .fetch_optional(pool)
        .await
    }
}
