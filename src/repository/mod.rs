//! Repository layer: storage gateways for the versioned entities.
//!
//! Each gateway is a trait so services can run against Postgres, the
//! in-memory store, or a mock. `save` is a compare-and-swap: an entity that
//! was read from storage is only written if its version still matches the
//! stored one, and the returned copy carries the incremented version.

pub mod authors;
pub mod books;
pub mod genres;
pub mod memory;
pub mod readers;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, Genre, Page, Reader, ReaderNumber, SearchBooksQuery},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;
    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool>;
    /// Insert a new book or conditionally update a stored one
    async fn save(&self, book: &Book) -> AppResult<Book>;
    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>>;
    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>>;
    /// `pattern` is a SQL `LIKE` pattern, e.g. `Tolk%`
    async fn find_by_author_name(&self, pattern: &str) -> AppResult<Vec<Book>>;
    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Vec<Book>>;
    async fn search(&self, page: &Page, query: &SearchBooksQuery) -> AppResult<Vec<Book>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Option<Author>>;
    async fn exists_by_author_number(&self, author_number: i64) -> AppResult<bool>;
    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Author>>;
    /// Insert when the author has no number yet, otherwise conditionally update
    async fn save(&self, author: &Author) -> AppResult<Author>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenreRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>>;
    async fn exists_by_name(&self, name: &str) -> AppResult<bool>;
    async fn find_all(&self) -> AppResult<Vec<Genre>>;
    async fn save(&self, genre: &Genre) -> AppResult<Genre>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReaderRepository: Send + Sync {
    async fn find_by_reader_number(&self, reader_number: ReaderNumber) -> AppResult<Option<Reader>>;
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;
    async fn find_by_phone_number(&self, phone_number: &str) -> AppResult<Vec<Reader>>;
    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Reader>>;
    /// Readers registered in `year`, used to assign the next reader number
    async fn count_by_year(&self, year: i32) -> AppResult<i64>;
    async fn save(&self, reader: &Reader) -> AppResult<Reader>;
}

/// Container for all storage gateways
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub genres: Arc<dyn GenreRepository>,
    pub readers: Arc<dyn ReaderRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            authors: Arc::new(authors::PgAuthorsRepository::new(pool.clone())),
            genres: Arc::new(genres::PgGenresRepository::new(pool.clone())),
            readers: Arc::new(readers::PgReadersRepository::new(pool)),
        }
    }

    /// Repository backed by a single process-local store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            books: store.clone(),
            authors: store.clone(),
            genres: store.clone(),
            readers: store,
        }
    }

    /// Resolve a genre name, failing with `NotFound` if it does not exist
    pub async fn resolve_genre(&self, name: &str) -> AppResult<Genre> {
        self.genres
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Genre {} not found", name)))
    }

    pub async fn resolve_genres(&self, names: &[String]) -> AppResult<Vec<Genre>> {
        let mut genres = Vec::with_capacity(names.len());
        for name in names {
            genres.push(self.resolve_genre(name).await?);
        }
        Ok(genres)
    }

    /// Resolve author numbers in order, failing on the first unknown one
    pub async fn resolve_authors(&self, author_numbers: &[i64]) -> AppResult<Vec<Author>> {
        let mut authors = Vec::with_capacity(author_numbers.len());
        for &number in author_numbers {
            let author = self
                .authors
                .find_by_author_number(number)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Author {} not found", number)))?;
            authors.push(author);
        }
        Ok(authors)
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`
pub(crate) fn conflict_on_duplicate(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message()),
        _ => AppError::Database(err),
    }
}

/// Outcome of a conditional update that touched no row
pub(crate) fn stale_or_missing(expected: i64, current: Option<i64>, what: impl FnOnce() -> String) -> AppError {
    match current {
        Some(actual) => {
            tracing::warn!(expected, actual, "Conditional update lost a version race");
            AppError::StaleVersion { expected, actual }
        }
        None => AppError::NotFound(what()),
    }
}

/// Escape `LIKE` wildcards in user input
pub(crate) fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
