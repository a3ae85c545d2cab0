use std::collections::BTreeMap;

use tracing::debug;

use sluice_core::id::{AccountId, ChangeId, RevisionId, SubmissionId};
use sluice_core::types::{Approval, Change, LabelEvent, LabelId};
use sluice_policy::{LabelNormalizer, NormalizedApprovals};
use sluice_store::{MetaTxn, ProjectState, StoreError};

/// Value of the synthetic submit vote.
pub const SUBMIT_VALUE: i16 = 1;

/// Brings a change's votes in line with current policy and records the
/// submitter's own vote.
pub struct ApprovalReconciler<'a> {
    normalizer: &'a dyn LabelNormalizer,
    project: &'a ProjectState,
    submission: SubmissionId,
}

impl<'a> ApprovalReconciler<'a> {
    pub fn new(
        normalizer: &'a dyn LabelNormalizer,
        project: &'a ProjectState,
        submission: SubmissionId,
    ) -> Self {
        Self {
            normalizer,
            project,
            submission,
        }
    }

    /// Reconcile votes on `original`, copying them onto the change's
    /// current revision if the strategy created a new one. Returns the
    /// submitter's vote, keyed to the revision it ends up on.
    pub fn reconcile(
        &self,
        txn: &mut dyn MetaTxn,
        change: &mut Change,
        original: RevisionId,
        submitter: AccountId,
        when_ms: u64,
    ) -> Result<Approval, StoreError> {
        change.reviewers.insert(submitter);

        let (normalized, mut submit) = self.approve(txn, change.id, original, submitter, when_ms)?;
        let current = change.current_revision;
        if current != original {
            debug!(
                submission = %self.submission,
                from = %original,
                to = %current,
                "copying approvals to new revision"
            );
            save_approvals(txn, change.id, &normalized, current, true, when_ms)?;
            submit = submit.with_revision(current);
        }
        Ok(submit)
    }

    fn approve(
        &self,
        txn: &mut dyn MetaTxn,
        change: ChangeId,
        revision: RevisionId,
        submitter: AccountId,
        when_ms: u64,
    ) -> Result<(NormalizedApprovals, Approval), StoreError> {
        let mut by_key: BTreeMap<(AccountId, LabelId), Approval> = txn
            .approvals_by_revision(&revision)?
            .into_iter()
            .map(|a| ((a.account(), a.label().clone()), a))
            .collect();

        let submit = Approval::new(revision, submitter, LabelId::submit(), SUBMIT_VALUE, when_ms);
        by_key.insert((submitter, LabelId::submit()), submit.clone());

        let normalized = self.normalizer.normalize(
            &self.project.label_types,
            &self.project.access,
            by_key.into_values().collect(),
        );
        save_approvals(txn, change, &normalized, revision, false, when_ms)?;
        Ok((normalized, submit))
    }
}

/// Write `normalized` onto `revision` and log what changed.
///
/// Label events are written for updated and deleted votes. Unchanged votes
/// only get an event when `include_unchanged` is set, except for the submit
/// vote which always does.
fn save_approvals(
    txn: &mut dyn MetaTxn,
    change: ChangeId,
    normalized: &NormalizedApprovals,
    revision: RevisionId,
    include_unchanged: bool,
    when_ms: u64,
) -> Result<(), StoreError> {
    let rekey = |approvals: &[Approval]| -> Vec<Approval> {
        approvals
            .iter()
            .map(|a| a.with_revision(revision))
            .collect()
    };
    let kept = rekey(&normalized.normalized());
    let deleted = rekey(&normalized.deleted);
    txn.upsert_approvals(&kept)?;
    txn.delete_approvals(&deleted)?;

    let event = |a: &Approval, value: Option<i16>| LabelEvent {
        revision,
        account: a.account(),
        label: a.label().clone(),
        value,
        at_ms: when_ms,
    };
    for a in rekey(&normalized.updated) {
        txn.append_label_event(&change, &event(&a, Some(a.value)))?;
    }
    for a in &deleted {
        txn.append_label_event(&change, &event(a, None))?;
    }
    for a in rekey(&normalized.unchanged) {
        if include_unchanged || a.is_submit() {
            txn.append_label_event(&change, &event(&a, Some(a.value)))?;
        }
    }
    Ok(())
}
