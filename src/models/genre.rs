//! Genre model

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::validation::{non_blank, require};

/// Book genre, identified by its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct Genre {
    name: String,
}

impl Genre {
    pub const MAX_LENGTH: usize = 100;

    pub fn new(name: &str) -> AppResult<Self> {
        Ok(Self {
            name: non_blank("Genre", name, Self::MAX_LENGTH)?,
        })
    }

    pub(crate) fn from_stored(name: String) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Create genre request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGenreRequest {
    pub name: Option<String>,
}

impl CreateGenreRequest {
    pub fn into_genre(self) -> AppResult<Genre> {
        Genre::new(&require("Genre", self.name)?)
    }
}
