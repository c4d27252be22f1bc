//! Account and Connection Configuration Module

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use crate::accounts::AccountId;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Security type for IMAP connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityType {
    #[default]
    SSL,
    STARTTLS,
    NONE,
}

impl SecurityType {
    pub fn default_imap_port(&self) -> u16 {
        match self {
            SecurityType::SSL => 993,
            SecurityType::STARTTLS => 143,
            SecurityType::NONE => 143,
        }
    }
}

/// Credential string wiped from memory on drop
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Zeroize for Secret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// IMAP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub security: SecurityType,
    pub username: String,
    pub password: Secret,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ImapConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_imap_port())
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            security: SecurityType::SSL,
            username: String::new(),
            password: Secret::default(),
            accept_invalid_certs: false, // Secure by default
        }
    }
}

/// One mail account and the user owning it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: AccountId,
    pub user_id: String,
    pub email: String,
    pub imap: ImapConfig,
}

impl AccountConfig {
    pub fn new(id: AccountId, user_id: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id,
            user_id: user_id.into(),
            imap: ImapConfig {
                username: email.clone(),
                ..Default::default()
            },
            email,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.user_id.is_empty() {
            errors.push(format!("Account {}: user id is required", self.id));
        }
        if self.email.is_empty() {
            errors.push(format!("Account {}: email is required", self.id));
        }
        if self.imap.host.is_empty() {
            errors.push(format!("Account {}: IMAP host is required", self.id));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Folder engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Issue a STATUS per selectable folder while listing
    #[serde(default = "default_true")]
    pub fetch_counts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { fetch_counts: true }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default)]
    pub settings: SyncSettings,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl AccountsConfig {
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        log::debug!("Loading account configuration from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: AccountsConfig = serde_json::from_str(raw)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for account in &self.accounts {
            if let Err(mut account_errors) = account.validate() {
                errors.append(&mut account_errors);
            }
            if !seen.insert((account.user_id.as_str(), account.id)) {
                errors.push(format!(
                    "Account {} is defined twice for user {}",
                    account.id, account.user_id
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
