/// Case study model and database operations
///
/// A case study belongs to one [`Industry`](super::industry::Industry), owns an
/// ordered list of results and links to any number of services through the
/// `case_study_services` join table.
///
/// Writes that reference an industry or service check the parent inside the
/// write transaction and fail with [`StoreError::MissingReference`] instead of
/// leaving the foreign-key violation to surface from SQLite.
///
/// # Example
///
/// ```no_run
/// use brightline_shared::models::case_study::{CaseStudy, CaseStudyFilter};
/// use brightline_shared::models::Page;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let published = CaseStudy::list(&pool, &CaseStudyFilter::published(), Page::default()).await?;
/// for study in published {
///     let services = CaseStudy::services(&pool, study.id).await?;
///     println!("{}: {} services", study.slug, services.len());
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::service::Service;
use super::{row_exists, Page, StoreError};

/// Case study describing work done for a client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseStudy {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub client_name: String,
    pub summary: String,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub industry_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measured outcome reported by a case study
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseStudyResult {
    pub id: Uuid,
    pub case_study_id: Uuid,
    /// What was measured, e.g. "Page load time"
    pub metric: String,
    /// Display value, e.g. "-45%"
    pub value: String,
    pub description: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for one result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaseStudyResult {
    pub metric: String,
    pub value: String,
    pub description: Option<String>,
    /// Defaults to the result's index in the submitted list
    pub order: Option<i64>,
}

/// Input for creating a case study
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaseStudy {
    pub slug: String,
    pub title: String,
    pub client_name: String,
    pub summary: String,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub industry_id: Uuid,
    pub is_featured: bool,
    pub is_published: bool,
    pub results: Vec<CreateCaseStudyResult>,
    pub service_ids: Vec<Uuid>,
}

/// Input for updating a case study
///
/// `results` and `service_ids` replace the existing lists when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCaseStudy {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub summary: Option<String>,
    pub challenge: Option<Option<String>>,
    pub solution: Option<Option<String>>,
    pub industry_id: Option<Uuid>,
    pub is_featured: Option<bool>,
    pub is_published: Option<bool>,
    pub results: Option<Vec<CreateCaseStudyResult>>,
    pub service_ids: Option<Vec<Uuid>>,
}

/// Filter for [`CaseStudy::list`] and [`CaseStudy::count`]
#[derive(Debug, Clone, Default)]
pub struct CaseStudyFilter {
    /// Hide unpublished case studies
    pub published_only: bool,

    /// Only case studies in this industry
    pub industry_id: Option<Uuid>,

    /// Only featured (true) or non-featured (false) case studies
    pub featured: Option<bool>,
}

impl CaseStudyFilter {
    /// Filter used for anonymous visitors
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if self.published_only {
            qb.push(" AND is_published = 1");
        }
        if let Some(industry_id) = self.industry_id {
            qb.push(" AND industry_id = ").push_bind(industry_id);
        }
        if let Some(featured) = self.featured {
            qb.push(" AND is_featured = ").push_bind(featured);
        }
    }
}

const CASE_STUDY_COLUMNS: &str = "id, slug, title, client_name, summary, challenge, solution, \
                                  industry_id, is_featured, is_published, created_at, updated_at";

impl CaseStudy {
    /// Creates a case study with its results and service links
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingReference`] if the industry or a linked service
    ///   does not exist
    /// - [`StoreError::Database`] on a duplicate slug or other database failure
    pub async fn create(pool: &SqlitePool, data: CreateCaseStudy) -> Result<Self, StoreError> {
        let mut tx = pool.begin().await?;

        if !row_exists(&mut tx, "industries", data.industry_id).await? {
            return Err(StoreError::MissingReference {
                entity: "industry",
                id: data.industry_id,
            });
        }

        let now = Utc::now();
        let study = sqlx::query_as::<_, CaseStudy>(&format!(
            r#"
            INSERT INTO case_studies (id, slug, title, client_name, summary, challenge, solution,
                                      industry_id, is_featured, is_published, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {CASE_STUDY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.slug)
        .bind(data.title)
        .bind(data.client_name)
        .bind(data.summary)
        .bind(data.challenge)
        .bind(data.solution)
        .bind(data.industry_id)
        .bind(data.is_featured)
        .bind(data.is_published)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        CaseStudyResult::insert_all(&mut tx, study.id, data.results).await?;
        link_services(&mut tx, study.id, &data.service_ids).await?;

        tx.commit().await?;
        Ok(study)
    }

    /// Finds a case study by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CaseStudy>(&format!(
            "SELECT {CASE_STUDY_COLUMNS} FROM case_studies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a case study by slug
    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CaseStudy>(&format!(
            "SELECT {CASE_STUDY_COLUMNS} FROM case_studies WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Lists case studies, newest first
    pub async fn list(
        pool: &SqlitePool,
        filter: &CaseStudyFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {CASE_STUDY_COLUMNS} FROM case_studies"
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as::<CaseStudy>().fetch_all(pool).await
    }

    /// Counts case studies matching `filter`
    pub async fn count(pool: &SqlitePool, filter: &CaseStudyFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM case_studies");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Services linked to a case study
    pub async fn services(pool: &SqlitePool, case_study_id: Uuid) -> Result<Vec<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT s.id, s.slug, s.title, s.summary, s.description, s.icon, s.is_published,
                   s.display_order, s.created_at, s.updated_at
            FROM services s
            JOIN case_study_services css ON css.service_id = s.id
            WHERE css.case_study_id = $1
            ORDER BY s.display_order ASC, s.title ASC
            "#,
        )
        .bind(case_study_id)
        .fetch_all(pool)
        .await
    }

    /// Updates a case study
    ///
    /// # Returns
    ///
    /// The updated case study, or None if no case study has this ID
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: UpdateCaseStudy,
    ) -> Result<Option<Self>, StoreError> {
        let mut tx = pool.begin().await?;

        if let Some(industry_id) = data.industry_id {
            if !row_exists(&mut tx, "industries", industry_id).await? {
                return Err(StoreError::MissingReference {
                    entity: "industry",
                    id: industry_id,
                });
            }
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE case_studies SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(slug) = data.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(client_name) = data.client_name {
            qb.push(", client_name = ").push_bind(client_name);
        }
        if let Some(summary) = data.summary {
            qb.push(", summary = ").push_bind(summary);
        }
        if let Some(challenge) = data.challenge {
            qb.push(", challenge = ").push_bind(challenge);
        }
        if let Some(solution) = data.solution {
            qb.push(", solution = ").push_bind(solution);
        }
        if let Some(industry_id) = data.industry_id {
            qb.push(", industry_id = ").push_bind(industry_id);
        }
        if let Some(is_featured) = data.is_featured {
            qb.push(", is_featured = ").push_bind(is_featured);
        }
        if let Some(is_published) = data.is_published {
            qb.push(", is_published = ").push_bind(is_published);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {CASE_STUDY_COLUMNS}"));

        let Some(study) = qb
            .build_query_as::<CaseStudy>()
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(results) = data.results {
            sqlx::query("DELETE FROM case_study_results WHERE case_study_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            CaseStudyResult::insert_all(&mut tx, id, results).await?;
        }

        if let Some(service_ids) = data.service_ids {
            sqlx::query("DELETE FROM case_study_services WHERE case_study_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_services(&mut tx, id, &service_ids).await?;
        }

        tx.commit().await?;
        Ok(Some(study))
    }

    /// Deletes a case study; results and service links cascade
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM case_studies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl CaseStudyResult {
    async fn insert_all(
        conn: &mut SqliteConnection,
        case_study_id: Uuid,
        results: Vec<CreateCaseStudyResult>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        for (index, result) in results.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO case_study_results (id, case_study_id, metric, value, description,
                                                "order", created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(case_study_id)
            .bind(result.metric)
            .bind(result.value)
            .bind(result.description)
            .bind(result.order.unwrap_or(index as i64))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists the results of one case study in display order
    pub async fn list_for_case_study(
        pool: &SqlitePool,
        case_study_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CaseStudyResult>(
            r#"
            SELECT id, case_study_id, metric, value, description, "order", created_at, updated_at
            FROM case_study_results
            WHERE case_study_id = $1
            ORDER BY "order" ASC, rowid ASC
            "#,
        )
        .bind(case_study_id)
        .fetch_all(pool)
        .await
    }
}

/// Links services to a case study, skipping duplicate IDs
async fn link_services(
    conn: &mut SqliteConnection,
    case_study_id: Uuid,
    service_ids: &[Uuid],
) -> Result<(), StoreError> {
    let mut seen = Vec::with_capacity(service_ids.len());

    for &service_id in service_ids {
        if seen.contains(&service_id) {
            continue;
        }
        if !row_exists(conn, "services", service_id).await? {
            return Err(StoreError::MissingReference {
                entity: "service",
                id: service_id,
            });
        }

        sqlx::query("INSERT INTO case_study_services (case_study_id, service_id) VALUES ($1, $2)")
            .bind(case_study_id)
            .bind(service_id)
            .execute(&mut *conn)
            .await?;
        seen.push(service_id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_filter() {
        let filter = CaseStudyFilter::published();
        assert!(filter.published_only);
        assert!(filter.industry_id.is_none());
        assert!(filter.featured.is_none());
    }

    #[test]
    fn test_filter_where_clause() {
        let filter = CaseStudyFilter {
            published_only: true,
            industry_id: Some(Uuid::new_v4()),
            featured: Some(true),
        };
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM case_studies");
        filter.push_where(&mut qb);

        let sql = qb.sql();
        assert!(sql.contains("is_published = 1"));
        assert!(sql.contains("industry_id = ?"));
        assert!(sql.contains("is_featured = ?"));
    }
}
