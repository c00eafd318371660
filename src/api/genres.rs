//! Genre endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{genre::CreateGenreRequest, Book, Genre},
    AppState,
};

/// List all genres
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.services.genres.find_all().await?))
}

/// Create a genre
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    request_body = CreateGenreRequest,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid name", body = crate::error::ErrorResponse),
        (status = 409, description = "Genre already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    Json(request): Json<CreateGenreRequest>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    let genre = state.services.genres.create(request).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// Get a genre by name
#[utoipa::path(
    get,
    path = "/genres/{name}",
    tag = "genres",
    params(("name" = String, Path, description = "Genre name")),
    responses(
        (status = 200, description = "Genre", body = Genre),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_genre(State(state): State<AppState>, Path(name): Path<String>) -> AppResult<Json<Genre>> {
    Ok(Json(state.services.genres.find_by_name(&name).await?))
}

/// Books of a genre
#[utoipa::path(
    get,
    path = "/genres/{name}/books",
    tag = "genres",
    params(("name" = String, Path, description = "Genre name")),
    responses(
        (status = 200, description = "Books in the genre", body = Vec<Book>),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_genre_books(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<Book>>> {
    let genre = state.services.genres.find_by_name(&name).await?;
    Ok(Json(state.services.books.find_by_genre(genre.name()).await?))
}
