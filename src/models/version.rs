//! Optimistic-locking version guard

use crate::error::{AppError, AppResult};

/// Version carried by an entity that has never been saved.
pub const INITIAL_VERSION: i64 = 1;

/// Gate for every mutation of a versioned entity: the caller's version must
/// equal the current one exactly.
pub fn check_version(expected: i64, actual: i64) -> AppResult<()> {
    if expected != actual {
        tracing::warn!(expected, actual, "Rejecting patch with stale version");
        return Err(AppError::StaleVersion { expected, actual });
    }
    Ok(())
}
