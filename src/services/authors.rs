//! Author service

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{CreateAuthorRequest, UpdateAuthorRequest},
        validation::require,
        Author, Book,
    },
    repository::{escape_like, Repository},
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, request: CreateAuthorRequest) -> AppResult<Author> {
        let name = require("Name", request.name)?;
        let bio = require("Bio", request.bio)?;
        let author = Author::new(&name, &bio, request.photo_uri.as_deref())?;

        let saved = self.repository.authors.save(&author).await?;
        tracing::info!(author_number = saved.author_number(), "Author created");
        Ok(saved)
    }

    pub async fn find_by_author_number(&self, author_number: i64) -> AppResult<Author> {
        self.repository
            .authors
            .find_by_author_number(author_number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Author {} not found", author_number)))
    }

    /// Authors whose name starts with `name`, case-insensitive
    pub async fn find_by_name(&self, name: &str) -> AppResult<Vec<Author>> {
        let pattern = format!("{}%", escape_like(name.trim()));
        self.repository.authors.find_by_name(&pattern).await
    }

    pub async fn partial_update(
        &self,
        author_number: i64,
        request: UpdateAuthorRequest,
        expected_version: i64,
    ) -> AppResult<Author> {
        let mut author = self.find_by_author_number(author_number).await?;
        author.apply_patch(expected_version, request.into())?;

        let saved = self.repository.authors.save(&author).await?;
        tracing::info!(author_number, version = saved.version(), "Author updated");
        Ok(saved)
    }

    /// Books listing the author, which must exist
    pub async fn books_by_author(&self, author_number: i64) -> AppResult<Vec<Book>> {
        if !self.repository.authors.exists_by_author_number(author_number).await? {
            return Err(AppError::not_found(format!("Author {} not found", author_number)));
        }
        self.repository.books.find_by_author_number(author_number).await
    }

    pub async fn remove_photo(&self, author_number: i64, expected_version: i64) -> AppResult<Author> {
        let mut author = self.find_by_author_number(author_number).await?;
        if author.photo().is_none() {
            return Err(AppError::not_found(format!("Author {} has no photo", author_number)));
        }

        author.remove_photo(expected_version)?;
        let saved = self.repository.authors.save(&author).await?;
        tracing::info!(author_number, "Author photo removed");
        Ok(saved)
    }
}
