//! # Mailbox Sync
//!
//! Folder listing, folder lifecycle and change detection for IMAP accounts.

pub mod accounts;
pub mod controller;
pub mod folders;
pub mod mail;

#[cfg(test)]
mod testing;

pub use accounts::{Account, AccountId, AccountNotFound, AccountService, ConfiguredAccountService};
pub use controller::{FoldersController, JsonResponse, RequestContext, Route, Status};
pub use folders::{
    ChangeDetector, ChangeQueryEntry, ChangeResult, DecodeError, FolderCatalog, FolderChange, FolderId,
    FolderLifecycleManager, FolderListing, SyncError, SyncFacade, SyncResult,
};
pub use mail::{Folder, FolderType, MailboxState, RemoteError, RemoteStore};

/// Load `.env` and initialize the logger, defaulting to `info`
pub fn init_logging() {
    dotenvy::dotenv().ok();

    // try_init: tests and embedders may have installed a logger already
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
