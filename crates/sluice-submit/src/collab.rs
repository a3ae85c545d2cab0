//! Collaborators the pipeline talks to but does not own.

use std::collections::HashMap;

use async_trait::async_trait;

use sluice_core::id::{AccountId, ChangeId, ObjectId};
use sluice_core::types::{Account, Change, PatchSet};
use sluice_store::{SluiceRepo, StoreError};

use crate::DispatchError;

pub trait AccountCache: Send + Sync {
    fn get(&self, id: AccountId) -> Option<Account>;
}

/// Accounts known up front, typically from the repository config.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    accounts: HashMap<AccountId, Account>,
}

impl StaticAccounts {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
        }
    }
}

impl AccountCache for StaticAccounts {
    fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).cloned()
    }
}

/// Repository-level settings that mirror project configuration.
pub trait RepoBackend: Send + Sync {
    fn set_project_description(&self, project: &str, description: Option<&str>)
        -> Result<(), StoreError>;
}

impl RepoBackend for SluiceRepo {
    fn set_project_description(
        &self,
        project: &str,
        description: Option<&str>,
    ) -> Result<(), StoreError> {
        if project != self.project() {
            return Err(StoreError::Config(format!("unknown project {project}")));
        }
        self.set_description(description)
    }
}

/// Everything a change-merged consumer gets to see.
#[derive(Debug, Clone)]
pub struct MergedEvent {
    pub change: Change,
    pub submitter: Option<Account>,
    pub patch_set: Option<PatchSet>,
    pub merge_result: ObjectId,
}

#[async_trait]
pub trait MergedNotifier: Send + Sync {
    async fn change_merged(&self, change: ChangeId, submitter: AccountId) -> Result<(), DispatchError>;
}

/// Post-merge hook. Runs on its own task and never holds up the batch.
#[async_trait]
pub trait MergedHook: Send + Sync {
    async fn change_merged(&self, event: &MergedEvent) -> Result<(), DispatchError>;
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl MergedNotifier for NoopNotifier {
    async fn change_merged(&self, _change: ChangeId, _submitter: AccountId) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Runs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl MergedHook for NoopHook {
    async fn change_merged(&self, _event: &MergedEvent) -> Result<(), DispatchError> {
        Ok(())
    }
}
