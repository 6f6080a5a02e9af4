/// Location model
///
/// Locations are where impact stories take place. Like industries they are
/// append-only reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Place an impact story is attached to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    /// State, province or other sub-national region
    pub region: Option<String>,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocation {
    pub slug: String,
    pub name: String,
    pub region: Option<String>,
    pub country: String,
}

const LOCATION_COLUMNS: &str = "id, slug, name, region, country, created_at, updated_at";

impl Location {
    /// Creates a location
    pub async fn create(pool: &SqlitePool, data: CreateLocation) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (id, slug, name, region, country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.slug)
        .bind(data.name)
        .bind(data.region)
        .bind(data.country)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Finds a location by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a location by slug
    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Lists all locations by country, then name
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY country ASC, name ASC"
        ))
        .fetch_all(pool)
        .await
    }
}
