//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookFilter, CreateBookRequest, SearchBooksRequest, UpdateBookRequest},
        Book, Page,
    },
    AppState,
};

use super::{IfMatch, Versioned};

/// One page of search results
#[derive(Serialize, ToSchema)]
pub struct BookSearchResponse {
    pub books: Vec<Book>,
    pub page: Page,
}

/// Create a book under the given ISBN
#[utoipa::path(
    put,
    path = "/books/{isbn}",
    tag = "books",
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Genre or author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    Json(request): Json<CreateBookRequest>,
) -> AppResult<Versioned<Book>> {
    let book = state.services.books.create(&isbn, request).await?;
    Ok(Versioned::created(book.version(), book))
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/books/{isbn}",
    tag = "books",
    params(("isbn" = String, Path, description = "ISBN")),
    responses(
        (status = 200, description = "Book, with its version in the ETag header", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(isbn): Path<String>) -> AppResult<Versioned<Book>> {
    let book = state.services.books.find_by_isbn(&isbn).await?;
    Ok(Versioned::ok(book.version(), book))
}

/// Partially update a book
#[utoipa::path(
    patch,
    path = "/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "ISBN"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input or missing If-Match", body = crate::error::ErrorResponse),
        (status = 404, description = "Book, genre or author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    IfMatch(version): IfMatch,
    Json(request): Json<UpdateBookRequest>,
) -> AppResult<Versioned<Book>> {
    let book = state.services.books.update(&isbn, request, version).await?;
    Ok(Versioned::ok(book.version(), book))
}

/// Remove a book's cover photo
#[utoipa::path(
    delete,
    path = "/books/{isbn}/photo",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "ISBN"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    responses(
        (status = 200, description = "Photo removed", body = Book),
        (status = 404, description = "Book or photo not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book_photo(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    IfMatch(version): IfMatch,
) -> AppResult<Versioned<Book>> {
    let book = state.services.books.remove_photo(&isbn, version).await?;
    Ok(Versioned::ok(book.version(), book))
}

/// Find books by title, genre or author name prefix.
/// Exactly one criterion is used, in that order of precedence.
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookFilter),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "No criterion given", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_books(
    State(state): State<AppState>,
    Query(filter): Query<BookFilter>,
) -> AppResult<Json<Vec<Book>>> {
    let books = &state.services.books;
    let found = if let Some(title) = filter.title {
        books.find_by_title(&title).await?
    } else if let Some(genre) = filter.genre {
        books.find_by_genre(&genre).await?
    } else if let Some(author) = filter.author {
        books.find_by_author_name(&author).await?
    } else {
        return Err(AppError::BadRequest(
            "One of title, genre or author is required".to_string(),
        ));
    };
    Ok(Json(found))
}

/// Paged book search
#[utoipa::path(
    post,
    path = "/books/search",
    tag = "books",
    request_body = SearchBooksRequest,
    responses(
        (status = 200, description = "One page of matching books", body = BookSearchResponse),
        (status = 400, description = "Invalid page", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Json(request): Json<SearchBooksRequest>,
) -> AppResult<Json<BookSearchResponse>> {
    let (books, page) = state.services.books.search(request.page, request.query).await?;
    Ok(Json(BookSearchResponse { books, page }))
}
