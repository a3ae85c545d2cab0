use std::collections::BTreeMap;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use sluice_core::id::{ChangeId, SubmissionId};
use sluice_core::types::{BranchName, Change, ChangeStatus, RefUpdateCommand, ResolvedCommit};
use sluice_store::{MetaStore, SluiceRepo};

use crate::commits::CommitStatus;
use crate::context::{ChangeContext, RepoContext, SubmitArgs};
use crate::op::SubmitOp;
use crate::strategy::StrategyEffects;
use crate::tip::MergeTip;
use crate::SubmitError;

/// What a committed batch did.
#[derive(Debug)]
pub struct BatchOutcome {
    pub submission_id: SubmissionId,
    pub merged: Vec<ChangeId>,
    pub ref_updates: Vec<RefUpdateCommand>,
    /// Changes that landed but whose metadata could not be fully written.
    pub problems: BTreeMap<ChangeId, String>,
    /// Notification and hook tasks still running on the runtime.
    pub notifications: Vec<JoinHandle<()>>,
}

impl BatchOutcome {
    /// Wait for the fire-and-forget notifications and hooks spawned by this
    /// batch.
    pub async fn wait_for_notifications(&mut self) {
        for handle in self.notifications.drain(..) {
            if let Err(e) = handle.await {
                error!(submission = %self.submission_id, error = %e, "notification task failed");
            }
        }
    }
}

/// Submits a set of changes to one branch as a unit.
///
/// Ref updates are committed first, then the metadata transaction, then
/// side effects. Any integration failure while staging aborts before either
/// store is written.
pub struct SubmitBatch<'a> {
    repo: &'a SluiceRepo,
    meta: &'a dyn MetaStore,
    args: SubmitArgs,
    dest: BranchName,
    tip: MergeTip,
    commits: CommitStatus,
    ops: Vec<SubmitOp>,
}

impl<'a> SubmitBatch<'a> {
    pub fn new(
        repo: &'a SluiceRepo,
        meta: &'a dyn MetaStore,
        args: SubmitArgs,
        dest: BranchName,
    ) -> Result<Self, SubmitError> {
        let initial = repo.get_ref(&dest.ref_name)?;
        Ok(Self {
            repo,
            meta,
            args,
            dest,
            tip: MergeTip::new(initial),
            commits: CommitStatus::new(),
            ops: Vec::new(),
        })
    }

    pub fn args(&self) -> &SubmitArgs {
        &self.args
    }

    pub fn add(
        &mut self,
        change: &Change,
        to_merge: ResolvedCommit,
        effects: Box<dyn StrategyEffects>,
    ) -> Result<(), SubmitError> {
        if change.dest != self.dest {
            return Err(SubmitError::WrongBranch {
                change: change.id,
                expected: self.dest.clone(),
                actual: change.dest.clone(),
            });
        }
        if change.status == ChangeStatus::Abandoned {
            return Err(SubmitError::ChangeClosed {
                change: change.id,
                status: change.status,
            });
        }
        self.commits.put(to_merge.clone());
        self.ops.push(SubmitOp::new(self.dest.clone(), to_merge, effects));
        Ok(())
    }

    pub fn execute(mut self) -> Result<BatchOutcome, SubmitError> {
        let sid = self.args.submission_id;
        let project = self.args.project_cache.get(&self.dest.project)?;

        for op in &mut self.ops {
            let mut ctx = RepoContext {
                repo: self.repo,
                tip: &mut self.tip,
                commits: &mut self.commits,
                caller: self.args.caller,
                when_ms: self.args.when_ms,
            };
            op.stage_ref(&self.args, &mut ctx)?;
        }

        let failed = self.commits.unmergeable();
        if !failed.is_empty() {
            let mut message = format!(
                "Failed to submit {} change(s) due to the following problems:",
                failed.len()
            );
            for (change, problem) in &failed {
                message.push_str(&format!("\nChange {change}: {problem}"));
            }
            return Err(SubmitError::integration(message));
        }

        let ref_updates: Vec<RefUpdateCommand> = self
            .ops
            .iter()
            .filter_map(|op| op.command().cloned())
            .collect();
        if !ref_updates.is_empty() {
            let reflog_message = format!("submit {sid}");
            self.repo
                .apply_ref_updates(&ref_updates, &caller_name(&self.args), &reflog_message)?;
        }
        debug!(submission = %sid, updates = ref_updates.len(), "ref updates committed");

        let mut txn = self.meta.begin()?;
        for op in &mut self.ops {
            let id = op.change_id();
            let change = txn.change(&id)?.ok_or(SubmitError::ChangeNotFound(id))?;
            let mut ctx = ChangeContext {
                txn: txn.as_mut(),
                change,
                project: project.clone(),
                tip: &self.tip,
                commits: &mut self.commits,
            };
            op.commit_metadata(&self.args, &mut ctx)?;
        }
        if let Err(e) = txn.commit() {
            // The refs have already moved; nothing below may run against
            // metadata that never landed.
            error!(submission = %sid, error = %e, "metadata commit failed after refs were updated");
            return Err(e.into());
        }

        let notifications = self
            .ops
            .iter_mut()
            .flat_map(|op| op.post_commit(&self.args))
            .collect();
        let merged: Vec<ChangeId> = self.ops.iter().map(|op| op.change_id()).collect();
        info!(submission = %sid, merged = merged.len(), "submission complete");
        Ok(BatchOutcome {
            submission_id: sid,
            merged,
            ref_updates,
            problems: self.commits.problems().clone(),
            notifications,
        })
    }
}

fn caller_name(args: &SubmitArgs) -> String {
    args.accounts
        .get(args.caller)
        .and_then(|a| a.full_name)
        .unwrap_or_else(|| format!("account-{}", args.caller))
}
