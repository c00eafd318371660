//! Business logic services

pub mod authors;
pub mod books;
pub mod genres;
pub mod readers;

use crate::{config::ReadersConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub authors: authors::AuthorsService,
    pub genres: genres::GenresService,
    pub readers: readers::ReadersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, readers_config: ReadersConfig) -> Self {
        Self {
            books: books::BooksService::new(repository.clone()),
            authors: authors::AuthorsService::new(repository.clone()),
            genres: genres::GenresService::new(repository.clone()),
            readers: readers::ReadersService::new(repository, readers_config),
        }
    }
}
