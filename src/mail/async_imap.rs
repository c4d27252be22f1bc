//! Async IMAP Remote Store using async-imap
//!
//! Connects lazily on the first remote call and keeps the session for the
//! lifetime of the store.

use crate::mail::{
    config::{ImapConfig, SecurityType},
    validate_mailbox_name, MailboxAttribute, MailboxState, RawMailbox, RemoteError, RemoteResult, RemoteStore,
};
use async_imap::types::NameAttribute;
use async_imap::Session;
use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use tokio_util::compat::TokioAsyncReadCompatExt;

type TlsStream = async_native_tls::TlsStream<tokio_util::compat::Compat<tokio::net::TcpStream>>;

/// STATUS items requested for change detection and counts
const STATUS_ITEMS: &str = "(MESSAGES UNSEEN UIDNEXT UIDVALIDITY)";

/// Substrings of NO responses that mean the mailbox is missing
const NONEXISTENT_HINTS: [&str; 4] = ["nonexistent", "doesn't exist", "does not exist", "not found"];

/// Classify an async-imap error into the store's error taxonomy
pub fn classify_error(err: async_imap::error::Error) -> RemoteError {
    use async_imap::error::Error;

    match err {
        Error::Io(e) => RemoteError::Connection(e.to_string()),
        Error::ConnectionLost => RemoteError::Connection("Connection lost".to_string()),
        Error::No(message) => {
            let lower = message.to_lowercase();
            if NONEXISTENT_HINTS.iter().any(|hint| lower.contains(hint)) {
                RemoteError::NotFound(message)
            } else {
                RemoteError::Protocol(message)
            }
        }
        other => RemoteError::Protocol(other.to_string()),
    }
}

fn convert_attribute(attribute: &NameAttribute<'_>) -> MailboxAttribute {
    match attribute {
        NameAttribute::NoInferiors => MailboxAttribute::NoInferiors,
        NameAttribute::NoSelect => MailboxAttribute::NoSelect,
        NameAttribute::Marked => MailboxAttribute::Marked,
        NameAttribute::Unmarked => MailboxAttribute::Unmarked,
        NameAttribute::All => MailboxAttribute::All,
        NameAttribute::Archive => MailboxAttribute::Archive,
        NameAttribute::Drafts => MailboxAttribute::Drafts,
        NameAttribute::Flagged => MailboxAttribute::Flagged,
        NameAttribute::Junk => MailboxAttribute::Junk,
        NameAttribute::Sent => MailboxAttribute::Sent,
        NameAttribute::Trash => MailboxAttribute::Trash,
        NameAttribute::Extension(raw) => MailboxAttribute::parse(raw),
        #[allow(unreachable_patterns)]
        other => MailboxAttribute::Other(format!("{:?}", other)),
    }
}

/// IMAP-backed remote store
pub struct ImapRemoteStore {
    session: Option<Session<TlsStream>>,
    config: ImapConfig,
}

impl ImapRemoteStore {
    pub fn new(config: ImapConfig) -> Self {
        Self {
            session: None,
            config,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connect and log in
    pub async fn connect(&mut self) -> RemoteResult<()> {
        let tls = if self.config.accept_invalid_certs {
            log::warn!("Accepting invalid SSL certificates for {}", self.config.host);
            async_native_tls::TlsConnector::new().danger_accept_invalid_certs(true)
        } else {
            async_native_tls::TlsConnector::new()
        };

        let address = match self.config.security {
            SecurityType::SSL => format!("{}:{}", self.config.host, self.config.port()),
            // async-imap has no STARTTLS upgrade; use implicit TLS on 993
            SecurityType::STARTTLS => format!("{}:993", self.config.host),
            SecurityType::NONE => {
                return Err(RemoteError::Connection(
                    "Insecure connections not supported".to_string(),
                ));
            }
        };

        log::debug!("Connecting to IMAP server {}", address);

        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))?;

        let tls_stream = tls
            .connect(&self.config.host, stream.compat())
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream);
        let session = client
            .login(&self.config.username, self.config.password.expose())
            .await
            .map_err(|e| RemoteError::Connection(format!("Authentication failed: {}", e.0)))?;

        self.session = Some(session);
        log::info!("Async IMAP connected to: {}", self.config.host);
        Ok(())
    }

    /// Log out and drop the session
    pub async fn disconnect(&mut self) -> RemoteResult<()> {
        if let Some(mut session) = self.session.take() {
            session.logout().await.map_err(classify_error)?;
        }
        Ok(())
    }

    async fn session(&mut self) -> RemoteResult<&mut Session<TlsStream>> {
        if self.session.is_none() {
            self.connect().await?;
        }
        self.session.as_mut().ok_or(RemoteError::NotConnected)
    }

    /// Drop a session whose transport failed so the next call reconnects
    fn forget_broken_session(&mut self, err: &RemoteError) {
        if matches!(err, RemoteError::Connection(_)) {
            self.session = None;
        }
    }

    async fn try_list(&mut self) -> RemoteResult<Vec<RawMailbox>> {
        let session = self.session().await?;
        let stream = session
            .list(Some(""), Some("*"))
            .await
            .map_err(classify_error)?;
        pin_mut!(stream);

        let mut mailboxes = Vec::new();
        while let Some(item) = stream.next().await {
            let name = item.map_err(classify_error)?;
            mailboxes.push(RawMailbox {
                name: name.name().to_string(),
                delimiter: name.delimiter().map(str::to_string),
                attributes: name.attributes().iter().map(convert_attribute).collect(),
            });
        }
        Ok(mailboxes)
    }

    async fn try_status(&mut self, path: &str) -> RemoteResult<MailboxState> {
        let session = self.session().await?;
        let mailbox = session
            .status(path, STATUS_ITEMS)
            .await
            .map_err(classify_error)?;

        Ok(MailboxState {
            messages: Some(mailbox.exists),
            unseen: mailbox.unseen,
            uid_next: mailbox.uid_next,
            uid_validity: mailbox.uid_validity,
            highest_modseq: mailbox.highest_modseq,
        })
    }
}

#[async_trait]
impl RemoteStore for ImapRemoteStore {
    async fn list_mailboxes(&mut self) -> RemoteResult<Vec<RawMailbox>> {
        let result = self.try_list().await;

        match &result {
            Ok(mailboxes) => log::debug!("LIST returned {} mailboxes", mailboxes.len()),
            Err(e) => self.forget_broken_session(e),
        }
        result
    }

    async fn mailbox_status(&mut self, path: &str) -> RemoteResult<MailboxState> {
        let result = self.try_status(path).await;

        if let Err(e) = &result {
            log::debug!("STATUS {} failed: {}", path, e);
            self.forget_broken_session(e);
        }
        result
    }

    async fn create_mailbox(&mut self, path: &str) -> RemoteResult<()> {
        validate_mailbox_name(path)?;

        let result = match self.session().await {
            Ok(session) => session.create(path).await.map_err(classify_error),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => log::info!("Created mailbox {}", path),
            Err(e) => self.forget_broken_session(e),
        }
        result
    }

    async fn delete_mailbox(&mut self, path: &str) -> RemoteResult<()> {
        validate_mailbox_name(path)?;

        let result = match self.session().await {
            Ok(session) => session.delete(path).await.map_err(classify_error),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => log::info!("Deleted mailbox {}", path),
            Err(e) => self.forget_broken_session(e),
        }
        result
    }

    async fn logout(&mut self) -> RemoteResult<()> {
        self.disconnect().await
    }
}
