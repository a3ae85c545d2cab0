use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use sluice_core::id::{ChangeId, ObjectId};
use sluice_core::types::{Approval, BranchName, Change, PatchSet, RefUpdateCommand, ResolvedCommit};

use crate::approvals::ApprovalReconciler;
use crate::collab::MergedEvent;
use crate::context::{ChangeContext, RepoContext, SubmitArgs};
use crate::metadata::ChangeMetadataWriter;
use crate::ref_plan::plan_ref_update;
use crate::strategy::StrategyEffects;
use crate::SubmitError;

/// Submission of one change: stage its ref update, record it as merged,
/// then run the side effects.
pub struct SubmitOp {
    dest: BranchName,
    to_merge: ResolvedCommit,
    effects: Box<dyn StrategyEffects>,
    command: Option<RefUpdateCommand>,
    submitter: Option<Approval>,
    merge_result: Option<ObjectId>,
    merged_patch_set: Option<PatchSet>,
    merged_change: Option<Change>,
}

impl SubmitOp {
    pub fn new(dest: BranchName, to_merge: ResolvedCommit, effects: Box<dyn StrategyEffects>) -> Self {
        Self {
            dest,
            to_merge,
            effects,
            command: None,
            submitter: None,
            merge_result: None,
            merged_patch_set: None,
            merged_change: None,
        }
    }

    pub fn change_id(&self) -> ChangeId {
        self.to_merge.change_id
    }

    /// The commit handed in for this change.
    pub fn commit(&self) -> &ResolvedCommit {
        &self.to_merge
    }

    pub fn command(&self) -> Option<&RefUpdateCommand> {
        self.command.as_ref()
    }

    pub fn dest(&self) -> &BranchName {
        &self.dest
    }

    /// Run the strategy against the shared tip and plan the ref update it
    /// implies.
    pub fn stage_ref(&mut self, args: &SubmitArgs, ctx: &mut RepoContext<'_>) -> Result<(), SubmitError> {
        let before = ctx.tip.current_tip();
        self.effects.update_repo(ctx, self.change_id())?;
        let after = ctx.tip.current_tip();
        self.command = plan_ref_update(ctx.repo, args.submission_id, &self.dest, before, after)?;
        Ok(())
    }

    /// Persist approvals, status and message inside the open metadata
    /// transaction.
    ///
    /// Storage failures are logged and recorded as a problem for the change;
    /// the phase still succeeds so the rest of the batch can land. Missing or
    /// unexpected classifications are caller bugs and are returned.
    pub fn commit_metadata(
        &mut self,
        args: &SubmitArgs,
        ctx: &mut ChangeContext<'_>,
    ) -> Result<(), SubmitError> {
        self.effects.update_change(ctx)?;
        let id = ctx.change.id;
        let resolved = ctx
            .commits
            .get(&id)
            .cloned()
            .ok_or(SubmitError::MissingStatus(id))?;
        let status = resolved
            .classification
            .ok_or(SubmitError::MissingStatus(id))?;
        debug!(submission = %args.submission_id, change = %id, ?status, "status for commit");
        if !status.is_clean() {
            return Err(SubmitError::UnexpectedStatus { change: id, status });
        }

        match self.write_metadata(args, ctx, &resolved) {
            Ok(()) => {}
            Err(SubmitError::Store(e)) => {
                let msg = format!("Error updating change status for {id}");
                error!(submission = %args.submission_id, change = %id, error = %e, "{msg}");
                ctx.commits.log_problem(id, msg);
            }
            Err(e) => return Err(e),
        }
        self.merged_change = Some(ctx.change.clone());
        Ok(())
    }

    fn write_metadata(
        &mut self,
        args: &SubmitArgs,
        ctx: &mut ChangeContext<'_>,
        resolved: &ResolvedCommit,
    ) -> Result<(), SubmitError> {
        let reconciler = ApprovalReconciler::new(
            args.normalizer.as_ref(),
            ctx.project.as_ref(),
            args.submission_id,
        );
        let submitter = reconciler.reconcile(
            ctx.txn,
            &mut ctx.change,
            self.to_merge.revision,
            args.caller,
            args.when_ms,
        )?;
        self.merge_result = ctx.tip.merge_result(&resolved.commit);

        let writer = ChangeMetadataWriter::new(args.accounts.as_ref(), args.submission_id, args.when_ms);
        let merged = writer.write(ctx.txn, &mut ctx.change, resolved, &submitter)?;
        self.submitter = Some(submitter);
        self.merged_patch_set = ctx.txn.patch_set(&merged)?;
        Ok(())
    }

    /// Best-effort side effects once both stores have committed. Returns the
    /// handles of the spawned notification and hook tasks.
    pub fn post_commit(&mut self, args: &SubmitArgs) -> Vec<JoinHandle<()>> {
        let sid = args.submission_id;
        let id = self.change_id();
        if let Err(e) = self.effects.post_update(args) {
            warn!(submission = %sid, change = %id, error = %e, "strategy post-update failed");
        }

        if let Some(command) = &self.command {
            args.tip_cache.update_fast_forward(
                &self.dest.project,
                &command.ref_name,
                command.old_id,
                command.new_id,
            );
            if self.dest.is_config() {
                self.refresh_project(args);
            }
        }

        let mut tasks = Vec::new();
        if self.merged_change.is_some() {
            let notifier = args.notifier.clone();
            let who = self
                .submitter
                .as_ref()
                .map(|s| s.account())
                .unwrap_or(args.caller);
            tasks.push(args.runtime.spawn(async move {
                if let Err(e) = notifier.change_merged(id, who).await {
                    error!(submission = %sid, change = %id, error = %e, "cannot send email for submitted patch set");
                }
            }));
        }

        if let Some(result) = self.merge_result {
            tasks.extend(self.spawn_hook(args, result));
        }
        tasks
    }

    fn refresh_project(&self, args: &SubmitArgs) {
        let project = &self.dest.project;
        args.project_cache.evict(project);
        let state = match args.project_cache.get(project) {
            Ok(state) => state,
            Err(e) => {
                error!(submission = %args.submission_id, project, error = %e, "cannot reload project configuration");
                return;
            }
        };
        if let Err(e) = args
            .repo_backend
            .set_project_description(project, state.config.description())
        {
            error!(submission = %args.submission_id, project, error = %e, "cannot update description");
        }
    }

    fn spawn_hook(&self, args: &SubmitArgs, merge_result: ObjectId) -> Option<JoinHandle<()>> {
        let change = self.merged_change.as_ref()?;
        let who = self
            .submitter
            .as_ref()
            .map(|s| s.account())
            .unwrap_or(args.caller);
        let event = MergedEvent {
            change: change.clone(),
            submitter: args.accounts.get(who),
            patch_set: self.merged_patch_set.clone(),
            merge_result,
        };
        let hook = args.hook.clone();
        let sid = args.submission_id;
        Some(args.runtime.spawn(async move {
            if let Err(e) = hook.change_merged(&event).await {
                error!(submission = %sid, change = %event.change.id, error = %e, "cannot run hook");
            }
        }))
    }
}
