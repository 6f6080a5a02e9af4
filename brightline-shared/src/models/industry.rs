/// Industry model
///
/// Industries group case studies. An industry cannot be deleted while case
/// studies still reference it (`ON DELETE RESTRICT`), so no delete operation is
/// offered here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Industry a case study belongs to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Industry {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an industry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIndustry {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

const INDUSTRY_COLUMNS: &str = "id, slug, name, description, created_at, updated_at";

impl Industry {
    /// Creates an industry
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if the slug is taken.
    pub async fn create(pool: &SqlitePool, data: CreateIndustry) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Industry>(&format!(
            r#"
            INSERT INTO industries (id, slug, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {INDUSTRY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.slug)
        .bind(data.name)
        .bind(data.description)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Finds an industry by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Industry>(&format!(
            "SELECT {INDUSTRY_COLUMNS} FROM industries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an industry by slug
    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Industry>(&format!(
            "SELECT {INDUSTRY_COLUMNS} FROM industries WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Lists all industries alphabetically
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Industry>(&format!(
            "SELECT {INDUSTRY_COLUMNS} FROM industries ORDER BY name ASC"
        ))
        .fetch_all(pool)
        .await
    }
}
