/// Service model and database operations
///
/// A service is a top-level offering shown on the marketing site. Each service
/// owns an ordered list of features that are deleted with it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE services (
///     id BLOB PRIMARY KEY NOT NULL,
///     slug TEXT NOT NULL UNIQUE,
///     title TEXT NOT NULL,
///     summary TEXT NOT NULL,
///     description TEXT,
///     icon TEXT,
///     is_published BOOLEAN NOT NULL DEFAULT 0,
///     display_order INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
///
/// CREATE TABLE service_features (
///     id BLOB PRIMARY KEY NOT NULL,
///     service_id BLOB NOT NULL REFERENCES services(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     "order" INTEGER NOT NULL DEFAULT 0,
///     ...
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::Page;

/// Service offered on the site
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_published: bool,
    /// Position in service listings (ascending)
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feature bullet belonging to one service
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceFeature {
    pub id: Uuid,
    pub service_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Position within the service (ascending)
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceFeature {
    pub title: String,
    pub description: Option<String>,
    /// Explicit position; defaults to the feature's index in the submitted list
    pub order: Option<i64>,
}

/// Input for creating a service together with its features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_published: bool,
    pub display_order: i64,
    pub features: Vec<CreateServiceFeature>,
}

/// Input for updating a service
///
/// `Some(None)` clears a nullable column. `features: Some(list)` replaces the
/// whole feature list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateService {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub is_published: Option<bool>,
    pub display_order: Option<i64>,
    pub features: Option<Vec<CreateServiceFeature>>,
}

const SERVICE_COLUMNS: &str =
    "id, slug, title, summary, description, icon, is_published, display_order, created_at, updated_at";

impl Service {
    /// Creates a service and its features in one transaction
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if the slug is taken.
    pub async fn create(pool: &SqlitePool, data: CreateService) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let now = Utc::now();

        let service = sqlx::query_as::<_, Service>(&format!(
            r#"
            INSERT INTO services (id, slug, title, summary, description, icon,
                                  is_published, display_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.slug)
        .bind(data.title)
        .bind(data.summary)
        .bind(data.description)
        .bind(data.icon)
        .bind(data.is_published)
        .bind(data.display_order)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        ServiceFeature::insert_all(&mut tx, service.id, data.features).await?;

        tx.commit().await?;
        Ok(service)
    }

    /// Finds a service by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a service by slug
    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Lists services by `display_order`, then title
    pub async fn list(
        pool: &SqlitePool,
        published_only: bool,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            r#"
            SELECT {SERVICE_COLUMNS} FROM services
            WHERE ($1 = 0 OR is_published = 1)
            ORDER BY display_order ASC, title ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(published_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    /// Counts services visible under the same filter as [`Service::list`]
    pub async fn count(pool: &SqlitePool, published_only: bool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE ($1 = 0 OR is_published = 1)")
            .bind(published_only)
            .fetch_one(pool)
            .await
    }

    /// Loads the services with the given IDs, in listing order
    pub async fn find_many(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY display_order ASC, title ASC");

        qb.build_query_as::<Service>().fetch_all(pool).await
    }

    /// Updates a service; replaces its features when `data.features` is set
    ///
    /// # Returns
    ///
    /// The updated service, or None if no service has this ID
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: UpdateService,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE services SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(slug) = data.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(summary) = data.summary {
            qb.push(", summary = ").push_bind(summary);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(icon) = data.icon {
            qb.push(", icon = ").push_bind(icon);
        }
        if let Some(is_published) = data.is_published {
            qb.push(", is_published = ").push_bind(is_published);
        }
        if let Some(display_order) = data.display_order {
            qb.push(", display_order = ").push_bind(display_order);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {SERVICE_COLUMNS}"));

        let Some(service) = qb
            .build_query_as::<Service>()
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(features) = data.features {
            sqlx::query("DELETE FROM service_features WHERE service_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            ServiceFeature::insert_all(&mut tx, id, features).await?;
        }

        tx.commit().await?;
        Ok(Some(service))
    }

    /// Deletes a service; its features and case-study links cascade
    ///
    /// # Returns
    ///
    /// True if the service was deleted, false if it didn't exist
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl ServiceFeature {
    /// Inserts features for a service inside the caller's transaction
    pub(crate) async fn insert_all(
        conn: &mut SqliteConnection,
        service_id: Uuid,
        features: Vec<CreateServiceFeature>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        for (index, feature) in features.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO service_features (id, service_id, title, description, "order",
                                              created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(service_id)
            .bind(feature.title)
            .bind(feature.description)
            .bind(feature.order.unwrap_or(index as i64))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists the features of one service in display order
    ///
    /// Ties on `order` keep insertion order.
    pub async fn list_for_service(
        pool: &SqlitePool,
        service_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ServiceFeature>(
            r#"
            SELECT id, service_id, title, description, "order", created_at, updated_at
            FROM service_features
            WHERE service_id = $1
            ORDER BY "order" ASC, rowid ASC
            "#,
        )
        .bind(service_id)
        .fetch_all(pool)
        .await
    }
}
