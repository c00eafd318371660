//! Author model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;

use super::{
    photo::Photo,
    validation::non_blank,
    version::{check_version, INITIAL_VERSION},
};

/// Author of one or more books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Author {
    /// Assigned by the store on first save
    author_number: Option<i64>,
    name: String,
    bio: String,
    photo: Option<Photo>,
    version: i64,
}

impl Author {
    pub const NAME_MAX_LENGTH: usize = 150;
    pub const BIO_MAX_LENGTH: usize = 4096;

    pub fn new(name: &str, bio: &str, photo_uri: Option<&str>) -> AppResult<Self> {
        let name = non_blank("Name", name, Self::NAME_MAX_LENGTH)?;
        let bio = non_blank("Bio", bio, Self::BIO_MAX_LENGTH)?;
        let photo = Photo::from_uri(photo_uri)?;

        Ok(Self {
            author_number: None,
            name,
            bio,
            photo,
            version: INITIAL_VERSION,
        })
    }

    /// Rebuild an author read back from storage.
    pub(crate) fn restore(
        author_number: i64,
        name: String,
        bio: String,
        photo_file: Option<String>,
        version: i64,
    ) -> Self {
        Self {
            author_number: Some(author_number),
            name,
            bio,
            photo: photo_file.map(Photo::from_stored),
            version,
        }
    }

    pub fn author_number(&self) -> Option<i64> {
        self.author_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bio(&self) -> &str {
        &self.bio
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Apply the present fields of `patch`, provided `expected_version` is
    /// the current version. On error nothing is changed.
    pub fn apply_patch(&mut self, expected_version: i64, patch: AuthorPatch) -> AppResult<()> {
        check_version(expected_version, self.version)?;

        let name = patch
            .name
            .map(|name| non_blank("Name", &name, Self::NAME_MAX_LENGTH))
            .transpose()?;
        let bio = patch
            .bio
            .map(|bio| non_blank("Bio", &bio, Self::BIO_MAX_LENGTH))
            .transpose()?;
        let photo = Photo::from_uri(patch.photo_uri.as_deref())?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(bio) = bio {
            self.bio = bio;
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

/// Resolved partial update for an author; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_uri: Option<String>,
}

/// Create author request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAuthorRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_uri: Option<String>,
}

/// Update author request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAuthorRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_uri: Option<String>,
}

impl From<UpdateAuthorRequest> for AuthorPatch {
    fn from(request: UpdateAuthorRequest) -> Self {
        Self {
            name: request.name,
            bio: request.bio,
            photo_uri: request.photo_uri,
        }
    }
}
