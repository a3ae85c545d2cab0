use std::sync::Arc;

use tokio::runtime::Handle;

use sluice_core::id::{AccountId, SubmissionId};
use sluice_core::types::Change;
use sluice_policy::{LabelNormalizer, RangeNormalizer};
use sluice_store::{MetaTxn, ProjectCache, ProjectState, SluiceRepo, TipCache};

use crate::collab::{
    AccountCache, MergedHook, MergedNotifier, NoopHook, NoopNotifier, RepoBackend, StaticAccounts,
};
use crate::commits::CommitStatus;
use crate::tip::MergeTip;

/// Batch-wide inputs shared by every op.
#[derive(Clone)]
pub struct SubmitArgs {
    pub submission_id: SubmissionId,
    pub caller: AccountId,
    pub when_ms: u64,
    pub accounts: Arc<dyn AccountCache>,
    pub normalizer: Arc<dyn LabelNormalizer>,
    pub tip_cache: Arc<TipCache>,
    pub project_cache: Arc<ProjectCache>,
    pub repo_backend: Arc<dyn RepoBackend>,
    pub notifier: Arc<dyn MergedNotifier>,
    pub hook: Arc<dyn MergedHook>,
    /// Runtime that fire-and-forget notifications are spawned on.
    pub runtime: Handle,
}

impl SubmitArgs {
    pub fn new(
        caller: AccountId,
        when_ms: u64,
        project_cache: Arc<ProjectCache>,
        repo_backend: Arc<dyn RepoBackend>,
        runtime: Handle,
    ) -> Self {
        Self {
            submission_id: SubmissionId::new(),
            caller,
            when_ms,
            accounts: Arc::new(StaticAccounts::default()),
            normalizer: Arc::new(RangeNormalizer),
            tip_cache: Arc::new(TipCache::new()),
            project_cache,
            repo_backend,
            notifier: Arc::new(NoopNotifier),
            hook: Arc::new(NoopHook),
            runtime,
        }
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountCache>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn LabelNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_tip_cache(mut self, tip_cache: Arc<TipCache>) -> Self {
        self.tip_cache = tip_cache;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn MergedNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn MergedHook>) -> Self {
        self.hook = hook;
        self
    }
}

/// What an op sees while staging its ref update.
pub struct RepoContext<'a> {
    pub repo: &'a SluiceRepo,
    pub tip: &'a mut MergeTip,
    pub commits: &'a mut CommitStatus,
    pub caller: AccountId,
    pub when_ms: u64,
}

/// What an op sees inside the metadata transaction.
pub struct ChangeContext<'a> {
    pub txn: &'a mut dyn MetaTxn,
    /// Working copy of the change; the metadata writer persists it.
    pub change: Change,
    pub project: Arc<ProjectState>,
    pub tip: &'a MergeTip,
    pub commits: &'a mut CommitStatus,
}
