//! Reader endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        reader::{CreateReaderRequest, ReaderFilter, UpdateReaderRequest},
        Reader, ReaderNumber,
    },
    AppState,
};

use super::{IfMatch, Versioned};

/// Register a reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    request_body = CreateReaderRequest,
    responses(
        (status = 201, description = "Reader registered", body = Reader),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Interest genre not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reader(
    State(state): State<AppState>,
    Json(request): Json<CreateReaderRequest>,
) -> AppResult<Versioned<Reader>> {
    let reader = state.services.readers.create(request).await?;
    Ok(Versioned::created(reader.version(), reader))
}

/// Find readers by phone number, or by name prefix
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    params(ReaderFilter),
    responses(
        (status = 200, description = "Matching readers", body = Vec<Reader>),
        (status = 400, description = "No criterion given", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_readers(
    State(state): State<AppState>,
    Query(filter): Query<ReaderFilter>,
) -> AppResult<Json<Vec<Reader>>> {
    let readers = &state.services.readers;
    let found = match (filter.phone, filter.name) {
        (Some(phone), _) => readers.find_by_phone_number(&phone).await?,
        (None, Some(name)) => readers.find_by_name(&name).await?,
        (None, None) => {
            return Err(AppError::BadRequest("One of name or phone is required".to_string()))
        }
    };
    Ok(Json(found))
}

/// Get a reader by number
#[utoipa::path(
    get,
    path = "/readers/{year}/{seq}",
    tag = "readers",
    params(
        ("year" = i32, Path, description = "Registration year"),
        ("seq" = i64, Path, description = "Sequence within the year")
    ),
    responses(
        (status = 200, description = "Reader, with its version in the ETag header", body = Reader),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reader(
    State(state): State<AppState>,
    Path((year, seq)): Path<(i32, i64)>,
) -> AppResult<Versioned<Reader>> {
    let reader = state
        .services
        .readers
        .find_by_reader_number(ReaderNumber::new(year, seq)?)
        .await?;
    Ok(Versioned::ok(reader.version(), reader))
}

/// Partially update a reader
#[utoipa::path(
    patch,
    path = "/readers/{year}/{seq}",
    tag = "readers",
    params(
        ("year" = i32, Path, description = "Registration year"),
        ("seq" = i64, Path, description = "Sequence within the year"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    request_body = UpdateReaderRequest,
    responses(
        (status = 200, description = "Reader updated", body = Reader),
        (status = 400, description = "Invalid input or missing If-Match", body = crate::error::ErrorResponse),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version or email taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_reader(
    State(state): State<AppState>,
    Path((year, seq)): Path<(i32, i64)>,
    IfMatch(version): IfMatch,
    Json(request): Json<UpdateReaderRequest>,
) -> AppResult<Versioned<Reader>> {
    let reader = state
        .services
        .readers
        .partial_update(ReaderNumber::new(year, seq)?, request, version)
        .await?;
    Ok(Versioned::ok(reader.version(), reader))
}

/// Remove a reader's photo
#[utoipa::path(
    delete,
    path = "/readers/{year}/{seq}/photo",
    tag = "readers",
    params(
        ("year" = i32, Path, description = "Registration year"),
        ("seq" = i64, Path, description = "Sequence within the year"),
        ("If-Match" = String, Header, description = "Current version, as returned in the ETag")
    ),
    responses(
        (status = 200, description = "Photo removed", body = Reader),
        (status = 404, description = "Reader or photo not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_reader_photo(
    State(state): State<AppState>,
    Path((year, seq)): Path<(i32, i64)>,
    IfMatch(version): IfMatch,
) -> AppResult<Versioned<Reader>> {
    let reader = state
        .services
        .readers
        .remove_photo(ReaderNumber::new(year, seq)?, version)
        .await?;
    Ok(Versioned::ok(reader.version(), reader))
}
