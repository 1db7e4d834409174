use crate::record::{CredentialsRecord, PostRecord, UserRecord};
use federwerk_common::model::post::{CreatePost, Post, PostMarker};
use federwerk_common::model::user::{CreateUser, User, UserMarker, Username};
use federwerk_common::model::{Id, ModelValidationError};
use federwerk_common::password::{self, PasswordHashError};
use sqlx::SqlitePool;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The username is already taken")]
    DuplicateUsername,
    #[error(transparent)]
    Password(#[from] PasswordHashError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Storage layer over a single-file SQLite database. Every operation is one
/// statement on a pooled connection; no multi-statement transactions exist
/// because each write touches exactly one row.
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates both relations if they do not exist yet. Idempotent; callers
    /// treat a failure here as fatal at startup.
    ///
    /// Username uniqueness is a `UNIQUE` column constraint so that concurrent
    /// signups with the same name cannot race an application-level check.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let id: i64 = sqlx::query_scalar(
            "
            INSERT INTO users (username, password_hash, email)
            VALUES (?, ?, ?)
            RETURNING id
            ",
        )
        .bind(user.username.get())
        .bind(&user.password_hash)
        .bind(user.email.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::DuplicateUsername
            }
            err => DbError::Sqlx(err),
        })?;

        Ok(id.into())
    }

    /// Exact, case-sensitive lookup.
    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT id, username, email
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Fetches the stored hash for the username and verifies the password
    /// against it. Unknown user and wrong password are both `None`; callers
    /// cannot tell them apart.
    pub async fn fetch_user_by_credentials(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "
            SELECT id, username, email, password_hash
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let (user, stored_hash) = record.into_user_and_hash()?;
        if password::verify(password, &stored_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let id: i64 = sqlx::query_scalar(
            "
            INSERT INTO posts (username, title, body)
            VALUES (?, ?, ?)
            RETURNING id
            ",
        )
        .bind(post.username().get())
        .bind(post.title())
        .bind(post.body())
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    /// All posts in insertion order (ascending id).
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(
            "
            SELECT id, username, title, body
            FROM posts
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(
            "
            SELECT id, username, title, body
            FROM posts
            WHERE id = ?
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }
}
