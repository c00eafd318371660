//! Genre service

use crate::{
    error::{AppError, AppResult},
    models::{genre::CreateGenreRequest, Genre},
    repository::Repository,
};

#[derive(Clone)]
pub struct GenresService {
    repository: Repository,
}

impl GenresService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn find_all(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.find_all().await
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Genre> {
        self.repository.resolve_genre(name).await
    }

    pub async fn create(&self, request: CreateGenreRequest) -> AppResult<Genre> {
        let genre = request.into_genre()?;
        if self.repository.genres.exists_by_name(genre.name()).await? {
            return Err(AppError::Conflict(format!("Genre {} already exists", genre)));
        }

        let saved = self.repository.genres.save(&genre).await?;
        tracing::info!(genre = saved.name(), "Genre created");
        Ok(saved)
    }
}
