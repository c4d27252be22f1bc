//! # Folder Synchronization
//!
//! Maps an account's remote mailbox hierarchy to stable folder identifiers,
//! detects which folders changed since a client last looked, and creates or
//! deletes remote folders.
//!
//! - `id`: transport-safe folder identifiers
//! - `catalog`: folder listing with per-folder metadata
//! - `changes`: change detection against a client snapshot
//! - `lifecycle`: folder create/delete
//! - `facade`: the four operations exposed to the boundary layer

pub mod catalog;
pub mod changes;
pub mod facade;
pub mod id;
pub mod lifecycle;


use crate::accounts::AccountNotFound;
use crate::mail::RemoteError;

// Re-export commonly used types
pub use catalog::FolderCatalog;
pub use changes::{ChangeDetector, ChangeQuery, ChangeQueryEntry, ChangeResult, FolderChange};
pub use facade::{FolderListing, SyncFacade};
pub use id::{DecodeError, FolderId};
pub use lifecycle::FolderLifecycleManager;

/// Result type alias for folder operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Folder operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Account (or, on delete, folder) could not be found
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<AccountNotFound> for SyncError {
    fn from(err: AccountNotFound) -> Self {
        SyncError::NotFound(err.to_string())
    }
}
