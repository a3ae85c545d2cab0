use std::collections::BTreeMap;
use std::sync::Mutex;

use sluice_core::id::{ChangeId, RevisionId};
use sluice_core::types::{Approval, ApprovalKey, Change, HistoryMessage, LabelEvent, PatchSet};

use crate::meta::{MetaStore, MetaTxn};
use crate::StoreError;

#[derive(Debug, Clone, Default)]
struct MetaState {
    changes: BTreeMap<ChangeId, Change>,
    patch_sets: BTreeMap<RevisionId, PatchSet>,
    approvals: BTreeMap<ApprovalKey, Approval>,
    label_events: BTreeMap<ChangeId, Vec<LabelEvent>>,
    messages: BTreeMap<ChangeId, Vec<HistoryMessage>>,
}

/// Metadata store held in process memory. A transaction works on a copy of
/// the state and swaps it in on commit. Commit fails if another transaction
/// committed since this one began.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    state: Mutex<Versioned>,
}

#[derive(Debug, Default)]
struct Versioned {
    version: u64,
    state: MetaState,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<(u64, MetaState), StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Meta("metadata lock poisoned".into()))?;
        Ok((guard.version, guard.state.clone()))
    }
}

impl MetaStore for MemoryMetaStore {
    fn begin(&self) -> Result<Box<dyn MetaTxn + '_>, StoreError> {
        let (base, state) = self.snapshot()?;
        Ok(Box::new(MemoryTxn {
            store: self,
            base,
            state,
        }))
    }
}

struct MemoryTxn<'a> {
    store: &'a MemoryMetaStore,
    base: u64,
    state: MetaState,
}

impl MetaTxn for MemoryTxn<'_> {
    fn change(&self, id: &ChangeId) -> Result<Option<Change>, StoreError> {
        Ok(self.state.changes.get(id).cloned())
    }

    fn save_change(&mut self, change: &Change) -> Result<(), StoreError> {
        self.state.changes.insert(change.id, change.clone());
        Ok(())
    }

    fn patch_set(&self, id: &RevisionId) -> Result<Option<PatchSet>, StoreError> {
        Ok(self.state.patch_sets.get(id).cloned())
    }

    fn insert_patch_set(&mut self, patch_set: &PatchSet) -> Result<(), StoreError> {
        self.state.patch_sets.insert(patch_set.id, patch_set.clone());
        Ok(())
    }

    fn approvals_by_revision(&self, revision: &RevisionId) -> Result<Vec<Approval>, StoreError> {
        Ok(self
            .state
            .approvals
            .values()
            .filter(|a| a.key.revision == *revision)
            .cloned()
            .collect())
    }

    fn upsert_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError> {
        for approval in approvals {
            self.state
                .approvals
                .insert(approval.key.clone(), approval.clone());
        }
        Ok(())
    }

    fn delete_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError> {
        for approval in approvals {
            self.state.approvals.remove(&approval.key);
        }
        Ok(())
    }

    fn append_label_event(&mut self, change: &ChangeId, event: &LabelEvent) -> Result<(), StoreError> {
        self.state
            .label_events
            .entry(*change)
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn label_events(&self, change: &ChangeId) -> Result<Vec<LabelEvent>, StoreError> {
        Ok(self
            .state
            .label_events
            .get(change)
            .cloned()
            .unwrap_or_default())
    }

    fn add_message(&mut self, message: &HistoryMessage) -> Result<(), StoreError> {
        self.state
            .messages
            .entry(message.change_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    fn messages(&self, change: &ChangeId) -> Result<Vec<HistoryMessage>, StoreError> {
        Ok(self.state.messages.get(change).cloned().unwrap_or_default())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut guard = self
            .store
            .state
            .lock()
            .map_err(|_| StoreError::Meta("metadata lock poisoned".into()))?;
        if guard.version != self.base {
            return Err(StoreError::Meta(format!(
                "metadata changed since transaction began (version {} -> {})",
                self.base, guard.version
            )));
        }
        guard.version += 1;
        guard.state = self.state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::id::AccountId;
    use sluice_core::types::{BranchName, LabelId};

    fn change() -> Change {
        Change::new(BranchName::new("demo", "main").unwrap(), AccountId(1), "subject", 1)
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let store = MemoryMetaStore::new();
        let c = change();
        {
            let mut txn = store.begin().unwrap();
            txn.save_change(&c).unwrap();
        }
        assert!(store.change(&c.id).unwrap().is_none());

        let mut txn = store.begin().unwrap();
        txn.save_change(&c).unwrap();
        txn.commit().unwrap();
        assert!(store.change(&c.id).unwrap().is_some());
    }

    #[test]
    fn overlapping_commit_is_rejected_not_lost() {
        let store = MemoryMetaStore::new();
        let (a, b) = (change(), change());

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();
        first.save_change(&a).unwrap();
        second.save_change(&b).unwrap();
        first.commit().unwrap();

        let err = second.commit().unwrap_err();
        assert!(matches!(err, StoreError::Meta(_)));
        assert!(store.change(&a.id).unwrap().is_some());
        assert!(store.change(&b.id).unwrap().is_none());

        let mut retry = store.begin().unwrap();
        retry.save_change(&b).unwrap();
        retry.commit().unwrap();
        assert!(store.change(&a.id).unwrap().is_some());
        assert!(store.change(&b.id).unwrap().is_some());
    }

    #[test]
    fn approvals_are_scoped_to_revision() {
        let store = MemoryMetaStore::new();
        let c = change();
        let rev1 = c.current_revision;
        let rev2 = rev1.next();
        let mut txn = store.begin().unwrap();
        txn.upsert_approvals(&[
            Approval::new(rev1, AccountId(1), LabelId::new("Code-Review"), 2, 10),
            Approval::new(rev2, AccountId(1), LabelId::new("Code-Review"), 1, 11),
        ])
        .unwrap();
        txn.commit().unwrap();

        let on_rev1 = store.approvals_by_revision(&rev1).unwrap();
        assert_eq!(on_rev1.len(), 1);
        assert_eq!(on_rev1[0].value, 2);
    }
}
