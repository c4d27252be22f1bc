//! Folder create/delete

use super::catalog::FolderCatalog;
use super::id::{is_virtual_marker, FolderId};
use super::{SyncError, SyncResult};
use crate::accounts::Account;
use crate::mail::{validate_mailbox_name, RemoteError};

/// Creates and deletes remote folders
#[derive(Debug, Clone, Default)]
pub struct FolderLifecycleManager {
    catalog: FolderCatalog,
}

impl FolderLifecycleManager {
    pub fn new(catalog: FolderCatalog) -> Self {
        Self { catalog }
    }

    /// Create `mailbox` as given; an existing name fails however the server says
    pub async fn create(&self, account: &mut Account, mailbox: &str) -> SyncResult<String> {
        validate_mailbox_name(mailbox)?;
        account.remote().create_mailbox(mailbox).await?;
        log::info!("Created folder {} on account {}", mailbox, account.id());
        Ok(mailbox.to_string())
    }

    /// Create `name` below the folder `parent`, returning the full path
    pub async fn create_subfolder(
        &self,
        account: &mut Account,
        parent: &FolderId,
        name: &str,
    ) -> SyncResult<String> {
        let segments = parent.segments()?;
        if is_virtual_marker(&segments) {
            return Err(SyncError::NotFound(format!("{} is not a mailbox", parent)));
        }

        let delimiter = self.catalog.delimiter(account).await?;
        let path = format!("{}{}{}", segments.join(delimiter.as_str()), delimiter, name);

        self.create(account, &path).await
    }

    /// Delete the folder addressed by `id`.
    ///
    /// A missing mailbox is reported the same way as a missing account.
    pub async fn delete(&self, account: &mut Account, id: &FolderId) -> SyncResult<()> {
        let segments = id.segments()?;
        if is_virtual_marker(&segments) {
            return Err(SyncError::NotFound(format!("{} is not a mailbox", id)));
        }

        // A single segment needs no delimiter
        let path = match segments.as_slice() {
            [single] => single.clone(),
            _ => {
                let delimiter = self.catalog.delimiter(account).await?;
                segments.join(delimiter.as_str())
            }
        };

        match account.remote().delete_mailbox(&path).await {
            Ok(()) => {
                log::info!("Deleted folder {} on account {}", path, account.id());
                Ok(())
            }
            Err(RemoteError::NotFound(message)) => Err(SyncError::NotFound(message)),
            Err(e) => Err(e.into()),
        }
    }
}
