//! Account resolution
//!
//! Accounts are owned by an external service. The folder engine only borrows
//! them: an `Account` is a capability carrying the owner's email address and
//! a live remote store connection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use crate::mail::{AccountConfig, AccountsConfig, ImapRemoteStore, RemoteStore};

pub type AccountId = u64;

/// Account lookup failed for the given user/account pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Account {account_id} not found for user {user_id}")]
pub struct AccountNotFound {
    pub user_id: String,
    pub account_id: AccountId,
}

/// Resolved mail account with its remote connection
pub struct Account {
    id: AccountId,
    email: String,
    store: Box<dyn RemoteStore>,
}

impl Account {
    pub fn new(id: AccountId, email: impl Into<String>, store: impl RemoteStore + 'static) -> Self {
        Self {
            id,
            email: email.into(),
            store: Box::new(store),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn remote(&mut self) -> &mut dyn RemoteStore {
        self.store.as_mut()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Resolves accounts by owner and id
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn find(&self, user_id: &str, account_id: AccountId) -> Result<Account, AccountNotFound>;
}

/// Account service backed by the static configuration file.
///
/// Each lookup hands out a fresh IMAP store; it connects on first use.
pub struct ConfiguredAccountService {
    accounts: HashMap<(String, AccountId), AccountConfig>,
}

impl ConfiguredAccountService {
    pub fn new(config: &AccountsConfig) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|account| ((account.user_id.clone(), account.id), account.clone()))
            .collect();

        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountService for ConfiguredAccountService {
    async fn find(&self, user_id: &str, account_id: AccountId) -> Result<Account, AccountNotFound> {
        let config = self
            .accounts
            .get(&(user_id.to_string(), account_id))
            .ok_or_else(|| AccountNotFound {
                user_id: user_id.to_string(),
                account_id,
            })?;

        log::debug!("Resolved account {} ({}) for user {}", account_id, config.email, user_id);

        Ok(Account::new(
            config.id,
            config.email.clone(),
            ImapRemoteStore::new(config.imap.clone()),
        ))
    }
}
