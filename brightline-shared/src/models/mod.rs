/// Database models for Brightline
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Site accounts and roles
/// - `service`: Services and their ordered features
/// - `industry`: Industries that case studies belong to
/// - `case_study`: Case studies, their results and linked services
/// - `location`: Locations that impact stories belong to
/// - `impact_story`: Impact stories and their metrics
/// - `form_submission`: Contact/quote/demo form intake records
/// - `file_upload`: Uploaded files and their optional analysis
///
/// Relationships are modeled as foreign keys with one-directional query
/// methods (e.g. `ServiceFeature::list_for_service`); nothing here loads a
/// back-reference implicitly.

pub mod case_study;
pub mod file_upload;
pub mod form_submission;
pub mod impact_story;
pub mod industry;
pub mod location;
pub mod service;
pub mod user;

use sqlx::SqliteConnection;
use uuid::Uuid;

/// Error type for writes that reference other rows
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced parent row does not exist
    #[error("{entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: Uuid },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum rows returned
    pub limit: i64,

    /// Rows skipped
    pub offset: i64,
}

impl Page {
    /// Upper bound on `limit`
    pub const MAX_LIMIT: i64 = 100;

    /// Builds a page, clamping `limit` to 1..=100 and `offset` to >= 0
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(20).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Checks that a row with `id` exists in `table`
///
/// `table` is always one of this crate's table names, never caller input.
pub(crate) async fn row_exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let query = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    sqlx::query_scalar::<_, bool>(&query)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}
