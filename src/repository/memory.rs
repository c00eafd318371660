//! Process-local store implementing every gateway.
//!
//! Used by the router tests and for running the server without a database.
//! The version compare and the write happen under one lock, which plays the
//! role of the conditional `UPDATE` in Postgres.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{AuthorRepository, BookRepository, GenreRepository, ReaderRepository};
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, Genre, Page, Reader, ReaderNumber, SearchBooksQuery},
};

#[derive(Default)]
struct State {
    genres: BTreeMap<String, Genre>,
    authors: BTreeMap<i64, Author>,
    last_author_number: i64,
    books: BTreeMap<String, Book>,
    readers: BTreeMap<(i32, i64), Reader>,
}

impl State {
    /// Books keep author snapshots; re-read them so renames show through.
    fn current(&self, book: &Book) -> Book {
        let authors = book
            .authors()
            .iter()
            .map(|author| {
                author
                    .author_number()
                    .and_then(|n| self.authors.get(&n))
                    .cloned()
                    .unwrap_or_else(|| author.clone())
            })
            .collect();

        Book::restore(
            book.isbn().to_string(),
            book.title().to_string(),
            book.description().map(str::to_string),
            book.genre().clone(),
            authors,
            book.photo().map(|p| p.photo_file().to_string()),
            book.version(),
        )
    }

    fn books_where(&self, predicate: impl Fn(&Book) -> bool) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .books
            .values()
            .map(|book| self.current(book))
            .filter(|book| predicate(book))
            .collect();
        books.sort_by(|a, b| (a.title(), a.isbn()).cmp(&(b.title(), b.isbn())));
        books
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn state(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

/// Case-insensitive SQL `LIKE` with `%`, `_` and backslash escapes.
fn like(value: &str, pattern: &str) -> bool {
    fn matches(value: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some(('%', rest)) => (0..=value.len()).any(|i| matches(&value[i..], rest)),
            Some(('_', rest)) => !value.is_empty() && matches(&value[1..], rest),
            Some(('\\', rest)) if !rest.is_empty() => {
                value.first() == rest.first() && matches(&value[1..], &rest[1..])
            }
            Some((c, rest)) => value.first() == Some(c) && matches(&value[1..], rest),
        }
    }

    let value: Vec<char> = value.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    matches(&value, &pattern)
}

fn contains(value: &str, needle: &str) -> bool {
    value.to_lowercase().contains(&needle.to_lowercase())
}

fn filter_matches(value: &str, filter: &Option<String>) -> bool {
    match filter.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => contains(value, needle),
    }
}

#[async_trait]
impl GenreRepository for MemoryStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        Ok(self.state()?.genres.get(name).cloned())
    }

    async fn exists_by_name(&self, name: &str) -> AppResult<bool> {
        Ok(self.state()?.genres.contains_key(name))
    }

    async fn find_all(&self) -> AppResult<Vec<Genre>> {
        Ok(self.state()?.genres.values().cloned().collect())
    }

    async fn save(&self, genre: &Genre) -> AppResult<Genre> {
        let mut state = self.state()?;
        if state.genres.contains_key(genre.name()) {
            return Err(AppError::Conflict(format!("Genre {} already exists", genre)));
        }
        state.genres.insert(genre.name().to_string(), genre.clone());
        Ok(genre.clone())
    }
}

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Option<Author>> {
        Ok(self.state()?.authors.get(&author_number).cloned())
    }

    async fn exists_by_author_number(&self, author_number: i64) -> AppResult<bool> {
        Ok(self.state()?.authors.contains_key(&author_number))
    }

    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Author>> {
        let state = self.state()?;
        let mut authors: Vec<Author> = state
            .authors
            .values()
            .filter(|a| like(a.name(), pattern))
            .cloned()
            .collect();
        authors.sort_by(|a, b| (a.name(), a.author_number()).cmp(&(b.name(), b.author_number())));
        Ok(authors)
    }

    async fn save(&self, author: &Author) -> AppResult<Author> {
        let mut state = self.state()?;

        let Some(author_number) = author.author_number() else {
            state.last_author_number += 1;
            let number = state.last_author_number;
            let stored = Author::restore(
                number,
                author.name().to_string(),
                author.bio().to_string(),
                author.photo().map(|p| p.photo_file().to_string()),
                author.version(),
            );
            state.authors.insert(number, stored.clone());
            return Ok(stored);
        };

        let current = state
            .authors
            .get(&author_number)
            .ok_or_else(|| AppError::not_found(format!("Author {} not found", author_number)))?;
        if current.version() != author.version() {
            return Err(AppError::StaleVersion {
                expected: author.version(),
                actual: current.version(),
            });
        }

        let stored = Author::restore(
            author_number,
            author.name().to_string(),
            author.bio().to_string(),
            author.photo().map(|p| p.photo_file().to_string()),
            author.version() + 1,
        );
        state.authors.insert(author_number, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let state = self.state()?;
        Ok(state.books.get(isbn).map(|book| state.current(book)))
    }

    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        Ok(self.state()?.books.contains_key(isbn))
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        let mut state = self.state()?;

        if let Some(author) = book.authors().iter().find(|a| a.author_number().is_none()) {
            return Err(AppError::invalid(format!("Author {} has not been saved", author.name())));
        }

        let version = match (book.is_persisted(), state.books.get(book.isbn())) {
            (false, Some(_)) => {
                return Err(AppError::Conflict(format!(
                    "Book with ISBN {} already exists",
                    book.isbn()
                )))
            }
            (false, None) => book.version(),
            (true, None) => return Err(AppError::not_found(format!("Book {} not found", book.isbn()))),
            (true, Some(current)) if current.version() != book.version() => {
                return Err(AppError::StaleVersion {
                    expected: book.version(),
                    actual: current.version(),
                })
            }
            (true, Some(_)) => book.version() + 1,
        };

        let stored = book.clone().saved(version);
        state.books.insert(book.isbn().to_string(), stored.clone());
        Ok(stored)
    }

    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        Ok(self.state()?.books_where(|b| contains(b.genre().name(), genre)))
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        Ok(self.state()?.books_where(|b| contains(b.title(), title)))
    }

    async fn find_by_author_name(&self, pattern: &str) -> AppResult<Vec<Book>> {
        Ok(self
            .state()?
            .books_where(|b| b.authors().iter().any(|a| like(a.name(), pattern))))
    }

    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Vec<Book>> {
        Ok(self
            .state()?
            .books_where(|b| b.authors().iter().any(|a| a.author_number() == Some(author_number))))
    }

    async fn search(&self, page: &Page, query: &SearchBooksQuery) -> AppResult<Vec<Book>> {
        let books = self.state()?.books_where(|b| {
            filter_matches(b.title(), &query.title)
                && filter_matches(b.genre().name(), &query.genre)
                && (query.author_name.as_deref().map_or(true, |n| n.trim().is_empty())
                    || b.authors().iter().any(|a| filter_matches(a.name(), &query.author_name)))
        });

        Ok(books
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }
}

#[async_trait]
impl ReaderRepository for MemoryStore {
    async fn find_by_reader_number(&self, reader_number: ReaderNumber) -> AppResult<Option<Reader>> {
        let key = (reader_number.year(), reader_number.sequence());
        Ok(self.state()?.readers.get(&key).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self
            .state()?
            .readers
            .values()
            .any(|r| r.email().eq_ignore_ascii_case(email)))
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> AppResult<Vec<Reader>> {
        Ok(self
            .state()?
            .readers
            .values()
            .filter(|r| r.phone_number() == phone_number)
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, pattern: &str) -> AppResult<Vec<Reader>> {
        let mut readers: Vec<Reader> = self
            .state()?
            .readers
            .values()
            .filter(|r| like(r.name(), pattern))
            .cloned()
            .collect();
        readers.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(readers)
    }

    async fn count_by_year(&self, year: i32) -> AppResult<i64> {
        Ok(self.state()?.readers.keys().filter(|(y, _)| *y == year).count() as i64)
    }

    async fn save(&self, reader: &Reader) -> AppResult<Reader> {
        let mut state = self.state()?;
        let number = reader.reader_number();
        let key = (number.year(), number.sequence());

        let email_taken = state
            .readers
            .iter()
            .any(|(k, r)| *k != key && r.email().eq_ignore_ascii_case(reader.email()));
        if email_taken {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                reader.email()
            )));
        }

        let version = match (reader.is_persisted(), state.readers.get(&key)) {
            (false, Some(_)) => {
                return Err(AppError::Conflict(format!("Reader {} already exists", number)))
            }
            (false, None) => reader.version(),
            (true, None) => return Err(AppError::not_found(format!("Reader {} not found", number))),
            (true, Some(current)) if current.version() != reader.version() => {
                return Err(AppError::StaleVersion {
                    expected: reader.version(),
                    actual: current.version(),
                })
            }
            (true, Some(_)) => reader.version() + 1,
        };

        let stored = reader.clone().saved(version);
        state.readers.insert(key, stored.clone());
        Ok(stored)
    }
}
