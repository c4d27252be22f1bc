//! Sync facade - list, create, delete and detect-changes entry points
//!
//! Every operation resolves the account first; an unknown account stops
//! the call before any remote work.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::catalog::FolderCatalog;
use super::changes::{to_query, ChangeDetector, ChangeQueryEntry, ChangeResult};
use super::id::FolderId;
use super::lifecycle::FolderLifecycleManager;
use super::{SyncError, SyncResult};
use crate::accounts::{Account, AccountId, AccountService};
use crate::mail::{Folder, SyncSettings};

/// Folder listing of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    pub id: AccountId,
    pub email: String,
    pub folders: Vec<Folder>,
    /// Delimiter of the first folder; `None` for an account without folders
    pub delimiter: Option<String>,
}

pub struct SyncFacade {
    accounts: Arc<dyn AccountService>,
    catalog: FolderCatalog,
    detector: ChangeDetector,
    lifecycle: FolderLifecycleManager,
}

impl SyncFacade {
    pub fn new(accounts: Arc<dyn AccountService>, settings: SyncSettings) -> Self {
        let catalog = FolderCatalog::new(settings);
        Self {
            accounts,
            lifecycle: FolderLifecycleManager::new(catalog.clone()),
            catalog,
            detector: ChangeDetector::new(),
        }
    }

    async fn account(&self, user_id: &str, account_id: AccountId) -> SyncResult<Account> {
        Ok(self.accounts.find(user_id, account_id).await?)
    }

    /// Log out once an operation is done with the account
    async fn release(account: &mut Account) {
        if let Err(e) = account.remote().logout().await {
            log::debug!("Logout from account {} failed: {}", account.id(), e);
        }
    }

    pub async fn list(&self, user_id: &str, account_id: AccountId) -> SyncResult<FolderListing> {
        let mut account = self.account(user_id, account_id).await?;
        let result = self.catalog.list(&mut account).await;
        Self::release(&mut account).await;

        let folders = result?;
        let delimiter = folders.first().map(|folder| folder.delimiter.clone());

        Ok(FolderListing {
            id: account_id,
            email: account.email().to_string(),
            folders,
            delimiter,
        })
    }

    pub async fn create(&self, user_id: &str, account_id: AccountId, mailbox: &str) -> SyncResult<String> {
        let mut account = self.account(user_id, account_id).await?;
        let result = self.lifecycle.create(&mut account, mailbox).await;
        Self::release(&mut account).await;
        result
    }

    pub async fn create_subfolder(
        &self,
        user_id: &str,
        account_id: AccountId,
        parent: &FolderId,
        name: &str,
    ) -> SyncResult<String> {
        let mut account = self.account(user_id, account_id).await?;
        let result = self.lifecycle.create_subfolder(&mut account, parent, name).await;
        Self::release(&mut account).await;
        result
    }

    pub async fn delete(&self, user_id: &str, account_id: AccountId, folder: &FolderId) -> SyncResult<()> {
        let mut account = self.account(user_id, account_id).await?;
        let result = self.lifecycle.delete(&mut account, folder).await;
        Self::release(&mut account).await;
        result
    }

    pub async fn detect_changes(
        &self,
        user_id: &str,
        account_id: AccountId,
        entries: Vec<ChangeQueryEntry>,
        cancel: &CancellationToken,
    ) -> SyncResult<ChangeResult> {
        let mut account = self.account(user_id, account_id).await?;
        let query = to_query(entries);
        let result = self.detector.detect(&mut account, &query, cancel).await;

        // A cancelled session may be mid-command; drop it instead
        if !matches!(result, Err(SyncError::Cancelled)) {
            Self::release(&mut account).await;
        }
        result
    }
}
