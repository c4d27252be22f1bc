//! Change detection
//!
//! Clients send the state they last saw for each folder; only folders whose
//! remote state differs come back. A missing key means "unchanged".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;

use super::catalog::delimiter_of;
use super::id::{is_virtual_marker, FolderId};
use super::{SyncError, SyncResult};
use crate::accounts::Account;
use crate::mail::{Folder, MailboxState, RawMailbox, RemoteError};

/// One folder of a change query, as sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeQueryEntry {
    pub id: FolderId,
    #[serde(flatten)]
    pub last_known: MailboxState,
    /// Set by clients that already know the folder is broken; any non-null
    /// value counts, usually `true` or an error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ChangeQueryEntry {
    pub fn new(id: FolderId, last_known: MailboxState) -> Self {
        Self {
            id,
            last_known,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_erroring(&self) -> bool {
        matches!(&self.error, Some(value) if !value.is_null())
    }
}

/// Parse a JSON array of query entries.
///
/// Entries that don't parse are dropped with a warning; only a payload that
/// is not an array fails.
pub fn parse_entries(raw: &str) -> serde_json::Result<Vec<ChangeQueryEntry>> {
    let values: Vec<Value> = serde_json::from_str(raw)?;

    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping malformed change query entry #{}: {}", index, e);
                None
            }
        })
        .collect())
}

pub type ChangeQuery = BTreeMap<FolderId, ChangeQueryEntry>;

/// Changed folders only
pub type ChangeResult = BTreeMap<FolderId, FolderChange>;

/// Key a list of entries by id; later duplicates win
pub fn to_query(entries: impl IntoIterator<Item = ChangeQueryEntry>) -> ChangeQuery {
    entries
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum FolderChange {
    /// Folder exists with a new state
    Updated(Folder),
    /// Folder no longer exists on the server
    Removed,
}

/// A query entry that will be checked remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'q> {
    pub id: &'q FolderId,
    pub segments: Vec<String>,
    pub last_known: &'q MailboxState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Drop virtual views, client-flagged errors and undecodable ids
    pub fn candidates<'q>(&self, query: &'q ChangeQuery) -> Vec<Candidate<'q>> {
        query
            .values()
            .filter_map(|entry| {
                if entry.is_erroring() {
                    log::debug!("Skipping folder {} flagged as erroring", entry.id);
                    return None;
                }

                let segments = match entry.id.segments() {
                    Ok(segments) => segments,
                    Err(e) => {
                        log::warn!("Skipping undecodable folder id {:?}: {}", entry.id.token(), e);
                        return None;
                    }
                };

                if is_virtual_marker(&segments) {
                    return None;
                }

                Some(Candidate {
                    id: &entry.id,
                    segments,
                    last_known: &entry.last_known,
                })
            })
            .collect()
    }

    /// Compare the query against the server.
    ///
    /// Cancellation discards everything gathered so far.
    pub async fn detect(
        &self,
        account: &mut Account,
        query: &ChangeQuery,
        cancel: &CancellationToken,
    ) -> SyncResult<ChangeResult> {
        let account_id = account.id();
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Change detection cancelled for account {}", account_id);
                Err(SyncError::Cancelled)
            }
            result = self.compare(account, query) => result,
        }
    }

    async fn compare(&self, account: &mut Account, query: &ChangeQuery) -> SyncResult<ChangeResult> {
        let candidates = self.candidates(query);
        let mut changes = ChangeResult::new();

        if candidates.is_empty() {
            return Ok(changes);
        }

        let mailboxes = account.remote().list_mailboxes().await?;
        let delimiter = delimiter_of(&mailboxes);
        let by_path: HashMap<&str, &RawMailbox> = mailboxes
            .iter()
            .map(|mailbox| (mailbox.name.as_str(), mailbox))
            .collect();

        for candidate in candidates {
            let path = candidate.segments.join(delimiter.as_str());

            let Some(mailbox) = by_path.get(path.as_str()) else {
                changes.insert(candidate.id.clone(), FolderChange::Removed);
                continue;
            };

            if !mailbox.is_selectable() {
                continue;
            }

            match account.remote().mailbox_status(&path).await {
                Ok(state) => {
                    if candidate.last_known.has_changed(&state) {
                        let folder = Folder::from_raw(mailbox).with_state(state);
                        changes.insert(candidate.id.clone(), FolderChange::Updated(folder));
                    }
                }
                Err(RemoteError::NotFound(_)) => {
                    changes.insert(candidate.id.clone(), FolderChange::Removed);
                }
                Err(e) => return Err(e.into()),
            }
        }

        log::debug!(
            "{} of {} queried folders changed on account {}",
            changes.len(),
            query.len(),
            account.id()
        );
        Ok(changes)
    }
}
