//! Folder catalog - the account's folder list with metadata

use crate::accounts::Account;
use crate::mail::{Folder, RawMailbox, RemoteError, RemoteResult, SyncSettings, DEFAULT_DELIMITER};

/// Lists an account's folders in server order
#[derive(Debug, Clone, Default)]
pub struct FolderCatalog {
    settings: SyncSettings,
}

impl FolderCatalog {
    pub fn new(settings: SyncSettings) -> Self {
        Self { settings }
    }

    /// LIST every mailbox, then STATUS each selectable one for its counts.
    ///
    /// A mailbox deleted between LIST and STATUS keeps zero counts.
    pub async fn list(&self, account: &mut Account) -> RemoteResult<Vec<Folder>> {
        let mailboxes = account.remote().list_mailboxes().await?;
        let mut folders = Vec::with_capacity(mailboxes.len());

        for mailbox in &mailboxes {
            let folder = Folder::from_raw(mailbox);

            if !self.settings.fetch_counts || !folder.is_selectable {
                folders.push(folder);
                continue;
            }

            match account.remote().mailbox_status(&folder.path).await {
                Ok(state) => folders.push(folder.with_state(state)),
                Err(RemoteError::NotFound(message)) => {
                    log::warn!("Mailbox {} vanished while listing: {}", folder.path, message);
                    folders.push(folder);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!(
            "Listed {} folders for account {}",
            folders.len(),
            account.id()
        );
        Ok(folders)
    }

    /// Hierarchy delimiter of the account, taken from its first mailbox
    pub async fn delimiter(&self, account: &mut Account) -> RemoteResult<String> {
        let mailboxes = account.remote().list_mailboxes().await?;
        Ok(delimiter_of(&mailboxes))
    }
}

/// IMAP uses one delimiter per account; the first mailbox carries it
pub fn delimiter_of(mailboxes: &[RawMailbox]) -> String {
    mailboxes
        .first()
        .and_then(|mailbox| mailbox.delimiter.clone())
        .unwrap_or_else(|| DEFAULT_DELIMITER.to_string())
}
