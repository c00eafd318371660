//! Genres repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{conflict_on_duplicate, GenreRepository};
use crate::{error::AppResult, models::Genre};

#[derive(Clone)]
pub struct PgGenresRepository {
    pool: Pool<Postgres>,
}

impl PgGenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreRepository for PgGenresRepository {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM genres WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name.map(Genre::from_stored))
    }

    async fn exists_by_name(&self, name: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_all(&self) -> AppResult<Vec<Genre>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().map(Genre::from_stored).collect())
    }

    async fn save(&self, genre: &Genre) -> AppResult<Genre> {
        sqlx::query("INSERT INTO genres (name) VALUES ($1)")
            .bind(genre.name())
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, || format!("Genre {} already exists", genre)))?;
        Ok(genre.clone())
    }
}
