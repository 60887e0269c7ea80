use thiserror::Error;

use crate::model::Mode;
use crate::store::StoreError;

/// Blocking message shown while the host record has no identity yet.
pub const RECORD_NOT_CREATED: &str =
    "This record hasn't been created yet. To enable file upload, create this record.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowseError {
    /// Record identity could not be resolved; the whole browser is blocked.
    #[error("{0}")]
    MetadataUnavailable(String),

    /// A selected id is not part of the current listing.
    #[error("item {id} is not in the current listing")]
    NotFound { id: String },

    /// A collaborator call failed.
    #[error("store request failed: {0}")]
    Store(#[from] StoreError),

    /// The action was rejected before reaching a store.
    #[error("{0}")]
    Validation(String),

    #[error("{operation} is only available in {required} mode")]
    WrongMode {
        operation: &'static str,
        required: Mode,
    },

    /// Folders are only removed through the confirmed folder delete.
    #[error("deleting folder {name} requires confirmation")]
    ConfirmationRequired { id: String, name: String },
}

impl BrowseError {
    pub fn validation(message: impl Into<String>) -> Self {
        BrowseError::Validation(message.into())
    }
}

pub type BrowseResult<T> = Result<T, BrowseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorKind;

    #[test]
    fn store_failures_keep_their_message() {
        let store = StoreError::new(StoreErrorKind::Unavailable, "offline");
        assert_eq!(BrowseError::from(store).to_string(), "store request failed: offline");
        assert_eq!(
            BrowseError::MetadataUnavailable(RECORD_NOT_CREATED.into()).to_string(),
            RECORD_NOT_CREATED
        );
    }

    #[test]
    fn wrong_mode_names_the_required_mode() {
        let err = BrowseError::WrongMode {
            operation: "navigate_into",
            required: Mode::Remote,
        };
        assert_eq!(err.to_string(), "navigate_into is only available in remote mode");
    }
}
