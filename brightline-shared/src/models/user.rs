/// User model and database operations
///
/// This module provides the User model and CRUD operations for site accounts.
/// Users are soft-retained: there is no delete operation, accounts are deactivated
/// by clearing `is_active`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BLOB PRIMARY KEY NOT NULL,
///     email TEXT NOT NULL COLLATE NOCASE UNIQUE,
///     password_hash TEXT NOT NULL,
///     full_name TEXT NOT NULL,
///     company TEXT,
///     role TEXT NOT NULL DEFAULT 'registered',
///     crm_contact_id TEXT,
///     is_active BOOLEAN NOT NULL DEFAULT 1,
///     last_login_at TEXT,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use brightline_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: "Jane Doe".to_string(),
///     company: None,
///     role: UserRole::Registered,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "USER@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Access role of a caller
///
/// `Anonymous` describes a caller without credentials and is never persisted.
/// Permission checks live in [`crate::auth::authorization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Unauthenticated visitor
    Anonymous,

    /// Self-registered account
    Registered,

    /// Can create, edit and delete site content
    ContentEditor,

    /// Full access, including users and form submissions
    Administrator,
}

impl UserRole {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Anonymous => "anonymous",
            UserRole::Registered => "registered",
            UserRole::ContentEditor => "content_editor",
            UserRole::Administrator => "administrator",
        }
    }

    /// Numeric level used for hierarchy comparisons
    pub fn level(&self) -> u8 {
        match self {
            UserRole::Anonymous => 0,
            UserRole::Registered => 1,
            UserRole::ContentEditor => 2,
            UserRole::Administrator => 3,
        }
    }
}

/// User model representing a site account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique case-insensitively
    pub email: String,

    /// Argon2id password hash. Never serialized into API responses.
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Optional company name
    pub company: Option<String>,

    /// Access role
    pub role: UserRole,

    /// Contact identifier in the external CRM, once synchronized
    pub crm_contact_id: Option<String>,

    /// Deactivated accounts cannot authenticate
    pub is_active: bool,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Optional company name
    pub company: Option<String>,

    /// Initial role
    pub role: UserRole,
}

/// Input for updating an existing user
///
/// All fields are optional. Only `Some` fields are written; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New display name
    pub full_name: Option<String>,

    /// New company (use Some(None) to clear)
    pub company: Option<Option<String>>,

    /// New role
    pub role: Option<UserRole>,

    /// New CRM contact reference (use Some(None) to clear)
    pub crm_contact_id: Option<Option<String>>,

    /// Activate or deactivate the account
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, company, role, crm_contact_id, \
                            is_active, last_login_at, created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint violation)
    /// or the role is `Anonymous` (check constraint violation).
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, company, role,
                               is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .bind(data.company)
        .bind(data.role)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Only `Some` fields in `data` are written. `updated_at` is always refreshed.
    ///
    /// # Returns
    ///
    /// The updated user, or None if no user has this ID
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = $2");
        let mut bind_count = 2;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if data.company.is_some() {
            bind_count += 1;
            query.push_str(&format!(", company = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.crm_contact_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", crm_contact_id = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id).bind(Utc::now());

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(company) = data.company {
            q = q.bind(company);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(crm_contact_id) = data.crm_contact_id {
            q = q.bind(crm_contact_id);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        q.fetch_optional(pool).await
    }

    /// Records the CRM contact id returned by a sync
    pub async fn set_crm_contact_id(
        pool: &SqlitePool,
        id: Uuid,
        crm_contact_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET crm_contact_id = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(crm_contact_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    pub async fn update_last_login(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users, newest first
    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts total number of users
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
