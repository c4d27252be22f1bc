//! In-memory remote store and account service for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::accounts::{Account, AccountId, AccountNotFound, AccountService};
use crate::mail::{MailboxState, RawMailbox, RemoteError, RemoteResult, RemoteStore};

/// A remote call as seen by the mock store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Status(String),
    Create(String),
    Delete(String),
}

#[derive(Default)]
struct MockState {
    mailboxes: Vec<RawMailbox>,
    states: HashMap<String, MailboxState>,
    calls: Vec<RemoteCall>,
    list_error: Option<RemoteError>,
    status_errors: HashMap<String, RemoteError>,
    create_error: Option<RemoteError>,
    delete_error: Option<RemoteError>,
    status_delay: Option<Duration>,
    logouts: usize,
}

/// Cloneable handle on a shared in-memory mailbox tree
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_mailbox(self, mailbox: RawMailbox, state: MailboxState) -> Self {
        {
            let mut inner = self.state();
            inner.states.insert(mailbox.name.clone(), state);
            inner.mailboxes.push(mailbox);
        }
        self
    }

    pub fn set_state(&self, path: &str, state: MailboxState) {
        self.state().states.insert(path.to_string(), state);
    }

    pub fn fail_list(&self, err: RemoteError) {
        self.state().list_error = Some(err);
    }

    pub fn fail_status(&self, path: &str, err: RemoteError) {
        self.state().status_errors.insert(path.to_string(), err);
    }

    pub fn fail_create(&self, err: RemoteError) {
        self.state().create_error = Some(err);
    }

    pub fn fail_delete(&self, err: RemoteError) {
        self.state().delete_error = Some(err);
    }

    pub fn delay_status(&self, delay: Duration) {
        self.state().status_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Status(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn logouts(&self) -> usize {
        self.state().logouts
    }

    pub fn mailbox_names(&self) -> Vec<String> {
        self.state().mailboxes.iter().map(|m| m.name.clone()).collect()
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn list_mailboxes(&mut self) -> RemoteResult<Vec<RawMailbox>> {
        let mut inner = self.state();
        inner.calls.push(RemoteCall::List);
        if let Some(err) = inner.list_error.clone() {
            return Err(err);
        }
        Ok(inner.mailboxes.clone())
    }

    async fn mailbox_status(&mut self, path: &str) -> RemoteResult<MailboxState> {
        let delay = {
            let mut inner = self.state();
            inner.calls.push(RemoteCall::Status(path.to_string()));
            inner.status_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.state();
        if let Some(err) = inner.status_errors.get(path) {
            return Err(err.clone());
        }
        inner
            .states
            .get(path)
            .copied()
            .ok_or_else(|| RemoteError::NotFound(format!("[NONEXISTENT] {}", path)))
    }

    async fn create_mailbox(&mut self, path: &str) -> RemoteResult<()> {
        let mut inner = self.state();
        inner.calls.push(RemoteCall::Create(path.to_string()));
        if let Some(err) = inner.create_error.clone() {
            return Err(err);
        }
        if inner.mailboxes.iter().any(|m| m.name == path) {
            return Err(RemoteError::Protocol("[ALREADYEXISTS] Mailbox exists".to_string()));
        }

        let delimiter = inner.mailboxes.first().and_then(|m| m.delimiter.clone());
        inner.mailboxes.push(RawMailbox {
            name: path.to_string(),
            delimiter,
            attributes: Vec::new(),
        });
        inner.states.insert(path.to_string(), MailboxState::default());
        Ok(())
    }

    async fn delete_mailbox(&mut self, path: &str) -> RemoteResult<()> {
        let mut inner = self.state();
        inner.calls.push(RemoteCall::Delete(path.to_string()));
        if let Some(err) = inner.delete_error.clone() {
            return Err(err);
        }

        let before = inner.mailboxes.len();
        inner.mailboxes.retain(|m| m.name != path);
        if inner.mailboxes.len() == before {
            return Err(RemoteError::NotFound(format!("[NONEXISTENT] {}", path)));
        }
        inner.states.remove(path);
        Ok(())
    }

    async fn logout(&mut self) -> RemoteResult<()> {
        self.state().logouts += 1;
        Ok(())
    }
}

/// Account service over mock stores, recording every lookup
#[derive(Clone, Default)]
pub struct MockAccountService {
    accounts: HashMap<(String, AccountId), (String, MockStore)>,
    lookups: Arc<Mutex<Vec<(String, AccountId)>>>,
}

impl MockAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, user_id: &str, account_id: AccountId, email: &str, store: MockStore) -> Self {
        self.accounts
            .insert((user_id.to_string(), account_id), (email.to_string(), store));
        self
    }

    pub fn lookups(&self) -> Vec<(String, AccountId)> {
        self.lookups.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AccountService for MockAccountService {
    async fn find(&self, user_id: &str, account_id: AccountId) -> Result<Account, AccountNotFound> {
        self.lookups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((user_id.to_string(), account_id));

        self.accounts
            .get(&(user_id.to_string(), account_id))
            .map(|(email, store)| Account::new(account_id, email.clone(), store.clone()))
            .ok_or_else(|| AccountNotFound {
                user_id: user_id.to_string(),
                account_id,
            })
    }
}
