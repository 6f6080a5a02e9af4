/// Impact story model and database operations
///
/// An impact story belongs to one [`Location`](super::location::Location) and
/// owns an ordered list of metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{row_exists, Page, StoreError};

/// Story about community or environmental impact at a location
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImpactStory {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: Option<String>,
    pub location_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Figure reported by an impact story
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImpactMetric {
    pub id: Uuid,
    pub impact_story_id: Uuid,
    pub label: String,
    pub value: String,
    /// Unit suffix such as "tonnes" or "%"
    pub unit: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImpactMetric {
    pub label: String,
    pub value: String,
    pub unit: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImpactStory {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: Option<String>,
    pub location_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub metrics: Vec<CreateImpactMetric>,
}

/// Input for updating an impact story; `metrics` replaces the list when present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateImpactStory {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<Option<String>>,
    pub location_id: Option<Uuid>,
    pub is_featured: Option<bool>,
    pub is_published: Option<bool>,
    pub metrics: Option<Vec<CreateImpactMetric>>,
}

/// Filter for [`ImpactStory::list`] and [`ImpactStory::count`]
#[derive(Debug, Clone, Default)]
pub struct ImpactStoryFilter {
    pub published_only: bool,
    pub location_id: Option<Uuid>,
    pub featured: Option<bool>,
}

impl ImpactStoryFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if self.published_only {
            qb.push(" AND is_published = 1");
        }
        if let Some(location_id) = self.location_id {
            qb.push(" AND location_id = ").push_bind(location_id);
        }
        if let Some(featured) = self.featured {
            qb.push(" AND is_featured = ").push_bind(featured);
        }
    }
}

const IMPACT_STORY_COLUMNS: &str = "id, slug, title, summary, body, location_id, is_featured, \
                                    is_published, created_at, updated_at";

impl ImpactStory {
    /// Creates an impact story with its metrics
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingReference`] if the location does not exist.
    pub async fn create(pool: &SqlitePool, data: CreateImpactStory) -> Result<Self, StoreError> {
        let mut tx = pool.begin().await?;

        if !row_exists(&mut tx, "locations", data.location_id).await? {
            return Err(StoreError::MissingReference {
                entity: "location",
                id: data.location_id,
            });
        }

        let story = sqlx::query_as::<_, ImpactStory>(&format!(
            r#"
            INSERT INTO impact_stories (id, slug, title, summary, body, location_id,
                                        is_featured, is_published, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {IMPACT_STORY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.slug)
        .bind(data.title)
        .bind(data.summary)
        .bind(data.body)
        .bind(data.location_id)
        .bind(data.is_featured)
        .bind(data.is_published)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        ImpactMetric::insert_all(&mut tx, story.id, data.metrics).await?;

        tx.commit().await?;
        Ok(story)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ImpactStory>(&format!(
            "SELECT {IMPACT_STORY_COLUMNS} FROM impact_stories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ImpactStory>(&format!(
            "SELECT {IMPACT_STORY_COLUMNS} FROM impact_stories WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Lists impact stories, newest first
    pub async fn list(
        pool: &SqlitePool,
        filter: &ImpactStoryFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {IMPACT_STORY_COLUMNS} FROM impact_stories"
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as::<ImpactStory>().fetch_all(pool).await
    }

    pub async fn count(pool: &SqlitePool, filter: &ImpactStoryFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM impact_stories");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates an impact story
    ///
    /// # Returns
    ///
    /// The updated story, or None if no story has this ID
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: UpdateImpactStory,
    ) -> Result<Option<Self>, StoreError> {
        let mut tx = pool.begin().await?;

        if let Some(location_id) = data.location_id {
            if !row_exists(&mut tx, "locations", location_id).await? {
                return Err(StoreError::MissingReference {
                    entity: "location",
                    id: location_id,
                });
            }
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE impact_stories SET updated_at = ");
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
        if let Some(body) = data.body {
            qb.push(", body = ").push_bind(body);
        }
        if let Some(location_id) = data.location_id {
            qb.push(", location_id = ").push_bind(location_id);
        }
        if let Some(is_featured) = data.is_featured {
            qb.push(", is_featured = ").push_bind(is_featured);
        }
        if let Some(is_published) = data.is_published {
            qb.push(", is_published = ").push_bind(is_published);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {IMPACT_STORY_COLUMNS}"));

        let Some(story) = qb
            .build_query_as::<ImpactStory>()
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(metrics) = data.metrics {
            sqlx::query("DELETE FROM impact_metrics WHERE impact_story_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            ImpactMetric::insert_all(&mut tx, id, metrics).await?;
        }

        tx.commit().await?;
        Ok(Some(story))
    }

    /// Deletes an impact story; metrics cascade
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM impact_stories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl ImpactMetric {
    async fn insert_all(
        conn: &mut SqliteConnection,
        impact_story_id: Uuid,
        metrics: Vec<CreateImpactMetric>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        for (index, metric) in metrics.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO impact_metrics (id, impact_story_id, label, value, unit, "order",
                                            created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(impact_story_id)
            .bind(metric.label)
            .bind(metric.value)
            .bind(metric.unit)
            .bind(metric.order.unwrap_or(index as i64))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists the metrics of one story in display order
    pub async fn list_for_story(
        pool: &SqlitePool,
        impact_story_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ImpactMetric>(
            r#"
            SELECT id, impact_story_id, label, value, unit, "order", created_at, updated_at
            FROM impact_metrics
            WHERE impact_story_id = $1
            ORDER BY "order" ASC, rowid ASC
            "#,
        )
        .bind(impact_story_id)
        .fetch_all(pool)
        .await
    }
}
