//! # Mailbox Sync - Mail Module
//!
//! Remote mail store seam: the `RemoteStore` trait the folder engine drives,
//! the records it returns, and the IMAP implementation behind it.

pub mod async_imap;
pub mod config;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::folders::FolderId;

// Re-export commonly used types
pub use self::async_imap::ImapRemoteStore;
pub use config::{AccountConfig, AccountsConfig, ConfigError, ImapConfig, Secret, SecurityType, SyncSettings};

/// Hierarchy delimiter assumed when the server reports `NIL`
pub const DEFAULT_DELIMITER: &str = "/";

/// Result type alias for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures reported by the remote mail store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IMAP error: {0}")]
    Protocol(String),

    #[error("Mailbox not found: {0}")]
    NotFound(String),

    #[error("Not connected")]
    NotConnected,
}

/// Mailbox names are sent quoted; line breaks and NUL can't be
pub fn validate_mailbox_name(name: &str) -> RemoteResult<()> {
    if name.is_empty() {
        return Err(RemoteError::Protocol("Mailbox name is empty".to_string()));
    }
    if name.chars().any(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(RemoteError::Protocol(format!(
            "Mailbox name contains forbidden characters: {:?}",
            name
        )));
    }
    Ok(())
}

/// Mailbox name attributes as reported by LIST
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MailboxAttribute {
    NoSelect,
    NoInferiors,
    Marked,
    Unmarked,
    HasChildren,
    HasNoChildren,
    // RFC 6154 special-use
    All,
    Archive,
    Drafts,
    Flagged,
    Junk,
    Sent,
    Trash,
    Other(String),
}

impl MailboxAttribute {
    /// Parse a raw attribute such as `\Noselect` (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        let bare = raw.trim_start_matches('\\');
        match bare.to_ascii_lowercase().as_str() {
            "noselect" | "nonexistent" => MailboxAttribute::NoSelect,
            "noinferiors" => MailboxAttribute::NoInferiors,
            "marked" => MailboxAttribute::Marked,
            "unmarked" => MailboxAttribute::Unmarked,
            "haschildren" => MailboxAttribute::HasChildren,
            "hasnochildren" => MailboxAttribute::HasNoChildren,
            "all" => MailboxAttribute::All,
            "archive" => MailboxAttribute::Archive,
            "drafts" => MailboxAttribute::Drafts,
            "flagged" => MailboxAttribute::Flagged,
            "junk" => MailboxAttribute::Junk,
            "sent" => MailboxAttribute::Sent,
            "trash" => MailboxAttribute::Trash,
            _ => MailboxAttribute::Other(raw.to_string()),
        }
    }
}

/// One entry of a LIST response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMailbox {
    pub name: String,
    pub delimiter: Option<String>,
    pub attributes: Vec<MailboxAttribute>,
}

impl RawMailbox {
    pub fn new(name: impl Into<String>, delimiter: Option<&str>) -> Self {
        Self {
            name: name.into(),
            delimiter: delimiter.map(str::to_string),
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<MailboxAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&MailboxAttribute::NoSelect)
    }
}

/// Mailbox state as returned by STATUS, or as last observed by a client.
///
/// Every field is optional: servers omit items they don't support and
/// clients may only remember part of what they saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unseen: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_next: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_validity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_modseq: Option<u64>,
}

impl MailboxState {
    pub fn is_unknown(&self) -> bool {
        *self == MailboxState::default()
    }

    /// Whether `current` differs from `self` in any field both sides know.
    ///
    /// A state that knows nothing always counts as changed.
    pub fn has_changed(&self, current: &MailboxState) -> bool {
        if self.is_unknown() {
            return true;
        }

        fn differs<T: PartialEq>(known: Option<T>, current: Option<T>) -> bool {
            matches!((known, current), (Some(a), Some(b)) if a != b)
        }

        differs(self.uid_validity, current.uid_validity)
            || differs(self.uid_next, current.uid_next)
            || differs(self.messages, current.messages)
            || differs(self.unseen, current.unseen)
            || differs(self.highest_modseq, current.highest_modseq)
    }
}

/// Email folder representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub path: String,
    pub folder_type: FolderType,
    pub delimiter: String,
    pub attributes: Vec<MailboxAttribute>,
    pub is_selectable: bool,
    pub unread_count: u32,
    pub total_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MailboxState>,
}

impl Folder {
    /// Build a folder from a LIST entry, without counts
    pub fn from_raw(raw: &RawMailbox) -> Self {
        let delimiter = raw
            .delimiter
            .clone()
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());
        let name = raw
            .name
            .rsplit(delimiter.as_str())
            .next()
            .unwrap_or(&raw.name)
            .to_string();

        Folder {
            id: FolderId::for_mailbox(&raw.name, &delimiter),
            name,
            path: raw.name.clone(),
            folder_type: FolderType::detect(&raw.name, &raw.attributes),
            delimiter,
            attributes: raw.attributes.clone(),
            is_selectable: raw.is_selectable(),
            unread_count: 0,
            total_count: 0,
            state: None,
        }
    }

    /// Attach a STATUS result
    pub fn with_state(mut self, state: MailboxState) -> Self {
        self.total_count = state.messages.unwrap_or(0);
        self.unread_count = state.unseen.unwrap_or(0);
        self.state = Some(state);
        self
    }
}

/// Folder types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderType {
    Inbox,
    Sent,
    Drafts,
    Trash,
    Junk,
    Archive,
    Starred,
    All,
    #[default]
    Custom,
}

impl FolderType {
    /// Special-use attributes win over name heuristics
    pub fn detect(name: &str, attributes: &[MailboxAttribute]) -> Self {
        if name.eq_ignore_ascii_case("INBOX") {
            return FolderType::Inbox;
        }
        attributes
            .iter()
            .find_map(Self::from_attribute)
            .unwrap_or_else(|| Self::from_name(name))
    }

    pub fn from_attribute(attribute: &MailboxAttribute) -> Option<Self> {
        match attribute {
            MailboxAttribute::Sent => Some(FolderType::Sent),
            MailboxAttribute::Drafts => Some(FolderType::Drafts),
            MailboxAttribute::Trash => Some(FolderType::Trash),
            MailboxAttribute::Junk => Some(FolderType::Junk),
            MailboxAttribute::Archive => Some(FolderType::Archive),
            MailboxAttribute::Flagged => Some(FolderType::Starred),
            MailboxAttribute::All => Some(FolderType::All),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("inbox") {
            FolderType::Inbox
        } else if lower.contains("sent") {
            FolderType::Sent
        } else if lower.contains("draft") {
            FolderType::Drafts
        } else if lower.contains("trash") || lower.contains("deleted") {
            FolderType::Trash
        } else if lower.contains("junk") || lower.contains("spam") {
            FolderType::Junk
        } else if lower.contains("archive") {
            FolderType::Archive
        } else if lower.contains("starred") || lower.contains("flagged") {
            FolderType::Starred
        } else {
            FolderType::Custom
        }
    }
}

/// Remote mail store operations used by the folder engine.
///
/// Methods take `&mut self`: a single connection is never driven by two
/// requests at once.
#[async_trait]
pub trait RemoteStore: Send {
    /// LIST every mailbox, in server order
    async fn list_mailboxes(&mut self) -> RemoteResult<Vec<RawMailbox>>;

    /// STATUS of one mailbox
    async fn mailbox_status(&mut self, path: &str) -> RemoteResult<MailboxState>;

    async fn create_mailbox(&mut self, path: &str) -> RemoteResult<()>;

    async fn delete_mailbox(&mut self, path: &str) -> RemoteResult<()>;

    /// End the session; stores without one have nothing to do
    async fn logout(&mut self) -> RemoteResult<()> {
        Ok(())
    }
}
