//! Error conversion helpers for contributor results
//!
//! Provides an extension trait that attaches the contributor's name.

use crate::application::{ApplicationError, ApplicationResult, ContributorError};

/// Extension trait for converting `ContributorResult` to `ApplicationResult`.
pub trait ContributorResultExt<T> {
    /// Tag a contributor failure with the contributor's name.
    ///
    /// # Example
    /// ```ignore
    /// entry.contributor().handle_drop(&target, &payload, None)
    ///     .await
    ///     .for_contributor(entry.name())?;
    /// ```
    fn for_contributor(self, name: &str) -> ApplicationResult<T>;
}

impl<T> ContributorResultExt<T> for Result<T, ContributorError> {
    fn for_contributor(self, name: &str) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Contributor {
            name: name.to_string(),
            source,
        })
    }
}
