//! API handlers for the library REST endpoints

pub mod authors;
pub mod books;
pub mod genres;
pub mod health;
pub mod openapi;
pub mod readers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Version the client expects the entity to be at, from `If-Match`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfMatch(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IfMatch {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::IF_MATCH)
            .ok_or_else(|| AppError::BadRequest("Missing If-Match header".to_string()))?
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid If-Match header".to_string()))?;

        parse_version(value)
            .map(IfMatch)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid If-Match header: {}", value)))
    }
}

/// Parse an entity tag such as `"3"`, `W/"3"` or `3` into a version
fn parse_version(tag: &str) -> Option<i64> {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    let tag = tag
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag);
    tag.parse().ok()
}

/// Single-entity response carrying its version as a strong ETag
pub struct Versioned<T> {
    pub status: StatusCode,
    pub version: i64,
    pub body: T,
}

impl<T> Versioned<T> {
    pub fn ok(version: i64, body: T) -> Self {
        Self {
            status: StatusCode::OK,
            version,
            body,
        }
    }

    pub fn created(version: i64, body: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            version,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Versioned<T> {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", self.version)) {
            response.headers_mut().insert(header::ETAG, etag);
        }
        response
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::ETAG]);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route("/genres/:name", get(genres::get_genre))
        .route("/genres/:name/books", get(genres::list_genre_books))
        // Authors
        .route("/authors", get(authors::find_authors).post(authors::create_author))
        .route("/authors/:number", get(authors::get_author).patch(authors::update_author))
        .route("/authors/:number/photo", delete(authors::delete_author_photo))
        .route("/authors/:number/books", get(authors::list_author_books))
        // Books
        .route("/books", get(books::find_books))
        .route("/books/search", post(books::search_books))
        .route(
            "/books/:isbn",
            get(books::get_book).put(books::create_book).patch(books::update_book),
        )
        .route("/books/:isbn/photo", delete(books::delete_book_photo))
        // Readers
        .route("/readers", get(readers::find_readers).post(readers::create_reader))
        .route(
            "/readers/:year/:seq",
            get(readers::get_reader).patch(readers::update_reader),
        )
        .route("/readers/:year/:seq/photo", delete(readers::delete_reader_photo))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
