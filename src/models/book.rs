//! Book model, ISBN value type and book request types

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::{
    author::Author,
    genre::Genre,
    photo::Photo,
    validation::{non_blank, optional_text},
    version::{check_version, INITIAL_VERSION},
};

/// ISBN-10 or ISBN-13, stored without separators
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let normalized = Self::normalize(raw);
        if normalized.is_empty() {
            return Err(AppError::invalid("Isbn cannot be blank"));
        }

        let valid = match normalized.len() {
            10 => is_valid_isbn10(&normalized),
            13 => is_valid_isbn13(&normalized),
            _ => false,
        };
        if !valid {
            return Err(AppError::invalid(format!("Invalid ISBN: {}", raw.trim())));
        }
        Ok(Self(normalized))
    }

    /// Strip separators and uppercase, without checking the checksum.
    /// Used for lookups, where an invalid ISBN simply matches nothing.
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_isbn13(isbn: &str) -> bool {
    let digits: Option<Vec<u32>> = isbn.chars().map(|c| c.to_digit(10)).collect();
    let Some(digits) = digits else {
        return false;
    };

    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10 == digits[12]
}

fn is_valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            'X' if i == 9 => 10,
            _ => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

/// Catalog book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Book {
    #[schema(value_type = String, example = "9782826012092")]
    isbn: Isbn,
    title: String,
    description: Option<String>,
    genre: Genre,
    authors: Vec<Author>,
    photo: Option<Photo>,
    version: i64,
    #[serde(skip)]
    persisted: bool,
}

impl Book {
    pub const TITLE_MAX_LENGTH: usize = 128;
    pub const DESCRIPTION_MAX_LENGTH: usize = 4096;

    pub fn new(
        isbn: &str,
        title: &str,
        description: Option<&str>,
        genre: Genre,
        authors: Vec<Author>,
        photo_uri: Option<&str>,
    ) -> AppResult<Self> {
        let isbn = Isbn::parse(isbn)?;
        let title = non_blank("Title", title, Self::TITLE_MAX_LENGTH)?;
        let description = optional_text("Description", description, Self::DESCRIPTION_MAX_LENGTH)?;
        let authors = non_empty_authors(authors)?;
        let photo = Photo::from_uri(photo_uri)?;

        Ok(Self {
            isbn,
            title,
            description,
            genre,
            authors,
            photo,
            version: INITIAL_VERSION,
            persisted: false,
        })
    }

    /// Rebuild a book read back from storage.
    pub(crate) fn restore(
        isbn: String,
        title: String,
        description: Option<String>,
        genre: Genre,
        authors: Vec<Author>,
        photo_file: Option<String>,
        version: i64,
    ) -> Self {
        Self {
            isbn: Isbn(isbn),
            title,
            description,
            genre,
            authors,
            photo: photo_file.map(Photo::from_stored),
            version,
            persisted: true,
        }
    }

    /// The stored copy after a successful write.
    pub(crate) fn saved(mut self, version: i64) -> Self {
        self.version = version;
        self.persisted = true;
        self
    }

    pub fn isbn(&self) -> &str {
        self.isbn.as_str()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn genre(&self) -> &Genre {
        &self.genre
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Apply the present fields of `patch`, provided `expected_version` is
    /// the current version. Every new value is validated before the first
    /// assignment, so a rejected patch leaves the book as it was.
    pub fn apply_patch(&mut self, expected_version: i64, patch: BookPatch) -> AppResult<()> {
        check_version(expected_version, self.version)?;

        let title = patch
            .title
            .map(|title| non_blank("Title", &title, Self::TITLE_MAX_LENGTH))
            .transpose()?;
        let description = patch
            .description
            .map(|d| optional_text("Description", Some(&d), Self::DESCRIPTION_MAX_LENGTH))
            .transpose()?;
        let authors = patch.authors.map(non_empty_authors).transpose()?;
        let photo = Photo::from_uri(patch.photo_uri.as_deref())?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(authors) = authors {
            self.authors = authors;
        }
        if let Some(photo) = photo {
            self.photo = Some(photo);
        }
        Ok(())
    }

    pub fn remove_photo(&mut self, expected_version: i64) -> AppResult<()> {
        check_version(expected_version, self.version)?;
        self.photo = None;
        Ok(())
    }
}

fn non_empty_authors(authors: Vec<Author>) -> AppResult<Vec<Author>> {
    if authors.is_empty() {
        return Err(AppError::invalid("Author list cannot be empty"));
    }
    Ok(authors)
}

/// Resolved partial update for a book; `None` leaves a field unchanged.
/// A present author list replaces the current one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<Genre>,
    pub authors: Option<Vec<Author>>,
    pub photo_uri: Option<String>,
}

/// Create book request (the ISBN comes from the path)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Genre name
    pub genre: Option<String>,
    /// Author numbers, in display order
    pub authors: Option<Vec<i64>>,
    pub photo_uri: Option<String>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Genre name
    pub genre: Option<String>,
    /// Replacement author numbers
    pub authors: Option<Vec<i64>>,
    pub photo_uri: Option<String>,
}

/// Single-criterion book lookup
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookFilter {
    pub title: Option<String>,
    pub genre: Option<String>,
    /// Author name prefix
    pub author: Option<String>,
}

/// Book search criteria; absent criteria match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct SearchBooksQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub author_name: Option<String>,
}

/// Page selection, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(number: i64, limit: i64) -> AppResult<Self> {
        if number < 1 {
            return Err(AppError::invalid("Page number must be at least 1"));
        }
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(AppError::invalid(format!(
                "Page limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        if (number - 1).checked_mul(limit).is_none() {
            return Err(AppError::invalid("Page number is out of range"));
        }
        Ok(Self { number, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Paged search request body
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SearchBooksRequest {
    pub page: Option<Page>,
    pub query: Option<SearchBooksQuery>,
}
