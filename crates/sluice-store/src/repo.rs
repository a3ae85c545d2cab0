use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use sluice_core::id::AccountId;
use sluice_core::types::Account;

use crate::layout::RepoLayout;
use crate::StoreError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Executable run after a change merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_merged: Option<PathBuf>,
    /// Seconds a hook may run before it is killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Write merged notifications to `.sluice/outbox`.
    #[serde(default = "default_true")]
    pub outbox: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { outbox: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub version: u32,
    pub project: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub hooks: HooksConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl RepoConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: project.into(),
            accounts: Vec::new(),
            hooks: HooksConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

pub fn write_config(layout: &RepoLayout, config: &RepoConfig) -> Result<(), StoreError> {
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| StoreError::Config(e.to_string()))?;
    std::fs::write(layout.config_file(), toml_str)?;
    Ok(())
}

pub fn read_config(layout: &RepoLayout) -> Result<RepoConfig, StoreError> {
    let content = std::fs::read_to_string(layout.config_file())?;
    let config: RepoConfig =
        toml::from_str(&content).map_err(|e| StoreError::Config(e.to_string()))?;
    Ok(config)
}
