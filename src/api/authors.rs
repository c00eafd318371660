//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        author::{CreateAuthorRequest, UpdateAuthorRequest},
        Author, Book,
    },
    AppState,
};

use super::{IfMatch, Versioned};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthorFilter {
    /// Name prefix, case-insensitive
    pub name: Option<String>,
}

/// Create an author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    Json(request): Json<CreateAuthorRequest>,
) -> AppResult<Versioned<Author>> {
    let author = state.services.authors.create(request).await?;
    Ok(Versioned::created(author.version(), author))
}

/// Find authors by name prefix; without a name every author is returned
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    params(AuthorFilter),
    responses(
        (status = 200, description = "Matching authors", body = Vec<Author>)
    )
)]
pub async fn find_authors(
    State(state): State<AppState>,
    Query(filter): Query<AuthorFilter>,
) -> AppResult<Json<Vec<Author>>> {
    let name = filter.name.unwrap_or_default();
    Ok(Json(state.services.authors.find_by_name(&name).await?))
}

/// Get an author by number
#[utoipa::path(
    get,
    path = "/authors/{number}",
    tag = "authors",
    params(("number" = i64, Path, description = "Author number")),
    responses(
        (status = 200, description = "Author, with its version in the ETag header", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(number): Path<i64>,
) -> AppResult<Versioned<Author>> {
    let author = state.services.authors.find_by_author_number(number).await?;
    Ok(Versioned::ok(author.version(), author))
}

/// Partially update an author
#[utoipa::path(
    patch,
    path = "/authors/{number}",
    tag = "authors",
    params(
        ("number" = i64, Path, description = "Author number"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 400, description = "Invalid input or missing If-Match", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    Path(number): Path<i64>,
    IfMatch(version): IfMatch,
    Json(request): Json<UpdateAuthorRequest>,
) -> AppResult<Versioned<Author>> {
    let author = state.services.authors.partial_update(number, request, version).await?;
    Ok(Versioned::ok(author.version(), author))
}

/// Remove an author's photo
#[utoipa::path(
    delete,
    path = "/authors/{number}/photo",
    tag = "authors",
    params(
        ("number" = i64, Path, description = "Author number"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    responses(
        (status = 200, description = "Photo removed", body = Author),
        (status = 404, description = "Author or photo not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author_photo(
    State(state): State<AppState>,
    Path(number): Path<i64>,
    IfMatch(version): IfMatch,
) -> AppResult<Versioned<Author>> {
    let author = state.services.authors.remove_photo(number, version).await?;
    Ok(Versioned::ok(author.version(), author))
}

/// Books by an author
#[utoipa::path(
    get,
    path = "/authors/{number}/books",
    tag = "authors",
    params(("number" = i64, Path, description = "Author number")),
    responses(
        (status = 200, description = "Books listing the author", body = Vec<Book>),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_author_books(
    State(state): State<AppState>,
    Path(number): Path<i64>,
) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.authors.books_by_author(number).await?))
}
