use sluice_core::id::{ChangeId, RevisionId};
use sluice_core::types::{Approval, Change, HistoryMessage, LabelEvent, PatchSet};

use crate::StoreError;

/// Review metadata: changes, votes, label history and messages.
///
/// All writes go through a [`MetaTxn`]; nothing is visible to other
/// transactions until [`MetaTxn::commit`] succeeds. Dropping a transaction
/// without committing discards it. Overlapping transactions never overwrite
/// each other: implementations either serialize writers or fail the later
/// commit.
pub trait MetaStore: Send + Sync {
    fn begin(&self) -> Result<Box<dyn MetaTxn + '_>, StoreError>;

    fn change(&self, id: &ChangeId) -> Result<Option<Change>, StoreError> {
        self.begin()?.change(id)
    }

    fn patch_set(&self, id: &RevisionId) -> Result<Option<PatchSet>, StoreError> {
        self.begin()?.patch_set(id)
    }

    fn approvals_by_revision(&self, revision: &RevisionId) -> Result<Vec<Approval>, StoreError> {
        self.begin()?.approvals_by_revision(revision)
    }

    fn messages(&self, change: &ChangeId) -> Result<Vec<HistoryMessage>, StoreError> {
        self.begin()?.messages(change)
    }

    fn label_events(&self, change: &ChangeId) -> Result<Vec<LabelEvent>, StoreError> {
        self.begin()?.label_events(change)
    }
}

pub trait MetaTxn {
    fn change(&self, id: &ChangeId) -> Result<Option<Change>, StoreError>;

    fn save_change(&mut self, change: &Change) -> Result<(), StoreError>;

    fn patch_set(&self, id: &RevisionId) -> Result<Option<PatchSet>, StoreError>;

    fn insert_patch_set(&mut self, patch_set: &PatchSet) -> Result<(), StoreError>;

    fn approvals_by_revision(&self, revision: &RevisionId) -> Result<Vec<Approval>, StoreError>;

    fn upsert_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError>;

    fn delete_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError>;

    fn append_label_event(&mut self, change: &ChangeId, event: &LabelEvent) -> Result<(), StoreError>;

    fn label_events(&self, change: &ChangeId) -> Result<Vec<LabelEvent>, StoreError>;

    fn add_message(&mut self, message: &HistoryMessage) -> Result<(), StoreError>;

    /// Messages of a change, oldest first.
    fn messages(&self, change: &ChangeId) -> Result<Vec<HistoryMessage>, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub(crate) fn approval_row_key(approval: &Approval) -> String {
    format!(
        "{}{}/{}",
        revision_prefix(&approval.key.revision),
        approval.key.account,
        approval.key.label
    )
}

/// Trailing slash keeps `X,1/` from matching `X,10/`.
pub(crate) fn revision_prefix(revision: &RevisionId) -> String {
    format!("{revision}/")
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Meta(e.to_string()))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(data).map_err(|e| StoreError::Meta(e.to_string()))
}
