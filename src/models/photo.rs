//! Photo attached to an author, book or reader

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::validation::non_blank;

/// A stored photo, referenced by its file URI. Photos are never edited in
/// place: an update swaps the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Photo {
    photo_file: String,
}

impl Photo {
    pub const MAX_LENGTH: usize = 2048;

    pub fn new(uri: &str) -> AppResult<Self> {
        Ok(Self {
            photo_file: non_blank("Photo URI", uri, Self::MAX_LENGTH)?,
        })
    }

    /// `None` stays `None`; there is no empty placeholder photo.
    pub fn from_uri(uri: Option<&str>) -> AppResult<Option<Self>> {
        uri.map(Self::new).transpose()
    }

    pub(crate) fn from_stored(photo_file: String) -> Self {
        Self { photo_file }
    }

    pub fn photo_file(&self) -> &str {
        &self.photo_file
    }
}
