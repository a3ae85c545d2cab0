use tracing::debug;

use sluice_core::id::{MessageId, RevisionId, SubmissionId};
use sluice_core::types::{Approval, Change, ChangeStatus, Classification, HistoryMessage, ResolvedCommit};
use sluice_store::MetaTxn;

use crate::collab::AccountCache;
use crate::SubmitError;

/// Text of the history message for a merge outcome, or `None` when the
/// outcome is recorded silently.
pub fn merged_message(
    resolved: &ResolvedCommit,
    status: Classification,
    submitter_name: Option<&str>,
) -> Result<Option<String>, SubmitError> {
    let mut text = match status {
        Classification::CleanMerge => status.message().to_string(),
        Classification::CleanRebase | Classification::CleanPick => {
            format!("{} as {}", status.message(), resolved.commit)
        }
        Classification::AlreadyMerged => return Ok(None),
        other => {
            return Err(SubmitError::UnexpectedStatus {
                change: resolved.change_id,
                status: other,
            })
        }
    };
    if let Some(name) = submitter_name {
        text.push_str(" by ");
        text.push_str(name);
    }
    Ok(Some(text))
}

/// Marks a change merged and appends the history message that says how.
pub struct ChangeMetadataWriter<'a> {
    accounts: &'a dyn AccountCache,
    submission: SubmissionId,
    when_ms: u64,
}

impl<'a> ChangeMetadataWriter<'a> {
    pub fn new(accounts: &'a dyn AccountCache, submission: SubmissionId, when_ms: u64) -> Self {
        Self {
            accounts,
            submission,
            when_ms,
        }
    }

    /// Returns the revision the change merged at.
    pub fn write(
        &self,
        txn: &mut dyn MetaTxn,
        change: &mut Change,
        resolved: &ResolvedCommit,
        submitter: &Approval,
    ) -> Result<RevisionId, SubmitError> {
        let status = resolved
            .classification
            .ok_or(SubmitError::MissingStatus(resolved.change_id))?;
        let name = self
            .accounts
            .get(submitter.account())
            .and_then(|a| a.full_name);
        let message = merged_message(resolved, status, name.as_deref())?.map(|text| HistoryMessage {
            id: MessageId::new(),
            change_id: change.id,
            revision: resolved.revision,
            author: None,
            written_at_ms: self.when_ms,
            text,
        });
        self.set_merged(txn, change, message)
    }

    fn set_merged(
        &self,
        txn: &mut dyn MetaTxn,
        change: &mut Change,
        message: Option<HistoryMessage>,
    ) -> Result<RevisionId, SubmitError> {
        debug!(submission = %self.submission, change = %change.id, "setting change merged");
        change.status = ChangeStatus::Merged;
        change.submission_id = Some(self.submission);
        change.updated_at_ms = self.when_ms;
        txn.save_change(change)?;
        if let Some(message) = message {
            txn.add_message(&message)?;
        }
        Ok(change.current_revision)
    }
}
