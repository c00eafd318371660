//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use super::{stale_or_missing, AuthorRepository};
use crate::{error::AppResult, models::Author};

#[derive(Debug, FromRow)]
pub(crate) struct AuthorRow {
    pub author_number: i64,
    pub name: String,
    pub bio: String,
    pub photo_file: Option<String>,
    pub version: i64,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author::restore(row.author_number, row.name, row.bio, row.photo_file, row.version)
    }
}

#[derive(Clone)]
pub struct PgAuthorsRepository {
    pool: Pool<Postgres>,
}

impl PgAuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn current_version(&self, author_number: i64) -> AppResult<Option<i64>> {
        let version = sqlx::query_scalar("SELECT version FROM authors WHERE author_number = $1")
            .bind(author_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl AuthorRepository for PgAuthorsRepository {
    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>("SELECT * FROM authors WHERE author_number = $1")
            .bind(author_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Author::from))
    }

    async fn exists_by_author_number(&self, author_number: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE author_number = $1)")
                .bind(author_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>(
            "SELECT * FROM authors WHERE name ILIKE $1 ORDER BY name, author_number",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Author::from).collect())
    }

    async fn save(&self, author: &Author) -> AppResult<Author> {
        let photo_file = author.photo().map(|p| p.photo_file());

        let Some(author_number) = author.author_number() else {
            let row = sqlx::query_as::<_, AuthorRow>(
                r#"
                INSERT INTO authors (name, bio, photo_file, version)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(author.name())
            .bind(author.bio())
            .bind(photo_file)
            .bind(author.version())
            .fetch_one(&self.pool)
            .await?;
            return Ok(row.into());
        };

        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            UPDATE authors
            SET name = $1, bio = $2, photo_file = $3, version = version + 1
            WHERE author_number = $4 AND version = $5
            RETURNING *
            "#,
        )
        .bind(author.name())
        .bind(author.bio())
        .bind(photo_file)
        .bind(author_number)
        .bind(author.version())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(stale_or_missing(
                author.version(),
                self.current_version(author_number).await?,
                || format!("Author {} not found", author_number),
            )),
        }
    }
}
