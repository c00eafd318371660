//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, genres, health, readers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library catalog and reader management REST API. \
                       Single-entity responses carry an ETag; updates must send it back in If-Match.",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Genres
        genres::list_genres,
        genres::create_genre,
        genres::get_genre,
        genres::list_genre_books,
        // Authors
        authors::create_author,
        authors::find_authors,
        authors::get_author,
        authors::update_author,
        authors::delete_author_photo,
        authors::list_author_books,
        // Books
        books::create_book,
        books::get_book,
        books::update_book,
        books::delete_book_photo,
        books::find_books,
        books::search_books,
        // Readers
        readers::create_reader,
        readers::find_readers,
        readers::get_reader,
        readers::update_reader,
        readers::delete_reader_photo,
    ),
    components(
        schemas(
            // Genres
            crate::models::Genre,
            crate::models::genre::CreateGenreRequest,
            // Authors
            crate::models::Author,
            crate::models::author::CreateAuthorRequest,
            crate::models::author::UpdateAuthorRequest,
            // Books
            crate::models::Book,
            crate::models::Page,
            crate::models::SearchBooksQuery,
            crate::models::book::CreateBookRequest,
            crate::models::book::UpdateBookRequest,
            crate::models::book::SearchBooksRequest,
            books::BookSearchResponse,
            // Readers
            crate::models::Reader,
            crate::models::reader::CreateReaderRequest,
            crate::models::reader::UpdateReaderRequest,
            // Shared
            crate::models::Photo,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "genres", description = "Book genres"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book catalog"),
        (name = "readers", description = "Reader registration and maintenance")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
