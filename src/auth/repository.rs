// User and token directories: capability traits and their Postgres implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::auth::{
    error::AuthError,
    models::{NewUser, User},
    password::Password,
    token::{Scope, TokenRecord},
};

/// Persistence capability for users.
///
/// Implementations must enforce username and email uniqueness atomically and
/// report a violation as [`AuthError::Conflict`].
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Insert a user, assigning its id and timestamps
    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;

    /// Find a user by exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    /// Find a user by id
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;
}

/// Persistence capability for tokens
#[async_trait]
pub trait TokenDirectory: Send + Sync + 'static {
    /// Store a token record (digest only)
    async fn insert(&self, record: &TokenRecord) -> Result<(), AuthError>;

    /// Resolve the owner of the record with this digest and scope, provided
    /// it expires strictly after `now`. Unknown and expired are both `None`.
    async fn find_user(
        &self,
        hash: &[u8],
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError>;
}

/// Row shape shared by every users query
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    bio: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password: Password::from_hash(row.password_hash),
            bio: row.bio,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed user directory
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let password_hash = user
            .password
            .hash()
            .ok_or_else(|| AuthError::PasswordHash("no password hash set".to_string()))?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password_hash, bio)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, bio, created_at, updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Check for unique constraint violation on username or email
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    tracing::debug!(
                        "Unique violation on {:?} inserting user",
                        db_err.constraint()
                    );
                    return AuthError::Conflict;
                }
            }
            AuthError::Directory(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, bio, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, bio, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

/// Postgres-backed token directory
#[derive(Clone)]
pub struct PgTokenDirectory {
    pool: PgPool,
}

impl PgTokenDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenDirectory for PgTokenDirectory {
    async fn insert(&self, record: &TokenRecord) -> Result<(), AuthError> {
        sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)")
            .bind(&record.hash)
            .bind(record.user_id)
            .bind(record.expiry)
            .bind(record.scope.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_user(
        &self,
        hash: &[u8],
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.bio, u.created_at, u.updated_at
            FROM users u
            INNER JOIN tokens t ON t.user_id = u.id
            WHERE t.hash = $1 AND t.scope = $2 AND t.expiry > $3
            "#,
        )
        .bind(hash)
        .bind(scope.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}
