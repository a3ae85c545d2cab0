use std::path::Path;

use redb::{ReadableTable, TableDefinition, TableError};
use serde::de::DeserializeOwned;

use sluice_core::id::{ChangeId, RevisionId};
use sluice_core::types::{Approval, Change, HistoryMessage, LabelEvent, PatchSet};

use crate::meta::{approval_row_key, decode, encode, revision_prefix, MetaStore, MetaTxn};
use crate::StoreError;

type RowTable = TableDefinition<'static, &'static str, &'static [u8]>;

const CHANGES: RowTable = TableDefinition::new("changes");
const PATCH_SETS: RowTable = TableDefinition::new("patch_sets");
const APPROVALS: RowTable = TableDefinition::new("approvals");
const LABEL_EVENTS: RowTable = TableDefinition::new("label_events");
const MESSAGES: RowTable = TableDefinition::new("messages");

fn meta_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Meta(e.to_string())
}

/// Metadata store backed by a redb database file.
pub struct RedbMetaStore {
    db: redb::Database,
}

impl RedbMetaStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = redb::Database::create(path).map_err(meta_err)?;
        Ok(Self { db })
    }

    fn read<T>(
        &self,
        table: RowTable,
        f: impl FnOnce(&redb::ReadOnlyTable<&'static str, &'static [u8]>) -> Result<T, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        let txn = self.db.begin_read().map_err(meta_err)?;
        match txn.open_table(table) {
            Ok(t) => f(&t).map(Some),
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(meta_err(e)),
        }
    }
}

impl MetaStore for RedbMetaStore {
    fn begin(&self) -> Result<Box<dyn MetaTxn + '_>, StoreError> {
        let txn = self.db.begin_write().map_err(meta_err)?;
        Ok(Box::new(RedbTxn { txn }))
    }

    // Reads outside a transaction use a read snapshot so they never wait on
    // an open writer.
    fn change(&self, id: &ChangeId) -> Result<Option<Change>, StoreError> {
        Ok(self.read(CHANGES, |t| get_row(t, &id.to_string()))?.flatten())
    }

    fn patch_set(&self, id: &RevisionId) -> Result<Option<PatchSet>, StoreError> {
        Ok(self.read(PATCH_SETS, |t| get_row(t, &id.to_string()))?.flatten())
    }

    fn approvals_by_revision(&self, revision: &RevisionId) -> Result<Vec<Approval>, StoreError> {
        Ok(self
            .read(APPROVALS, |t| scan_prefix(t, &revision_prefix(revision)))?
            .unwrap_or_default())
    }

    fn messages(&self, change: &ChangeId) -> Result<Vec<HistoryMessage>, StoreError> {
        Ok(self
            .read(MESSAGES, |t| scan_prefix(t, &format!("{change}/")))?
            .unwrap_or_default())
    }

    fn label_events(&self, change: &ChangeId) -> Result<Vec<LabelEvent>, StoreError> {
        Ok(self
            .read(LABEL_EVENTS, |t| scan_prefix(t, &format!("{change}/")))?
            .unwrap_or_default())
    }
}

struct RedbTxn {
    txn: redb::WriteTransaction,
}

impl RedbTxn {
    fn put(
        &mut self,
        table: RowTable,
        key: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let mut t = self.txn.open_table(table).map_err(meta_err)?;
        t.insert(key, value).map_err(meta_err)?;
        Ok(())
    }
}

impl MetaTxn for RedbTxn {
    fn change(&self, id: &ChangeId) -> Result<Option<Change>, StoreError> {
        let t = self.txn.open_table(CHANGES).map_err(meta_err)?;
        get_row(&t, &id.to_string())
    }

    fn save_change(&mut self, change: &Change) -> Result<(), StoreError> {
        let data = encode(change)?;
        self.put(CHANGES, &change.id.to_string(), &data)
    }

    fn patch_set(&self, id: &RevisionId) -> Result<Option<PatchSet>, StoreError> {
        let t = self.txn.open_table(PATCH_SETS).map_err(meta_err)?;
        get_row(&t, &id.to_string())
    }

    fn insert_patch_set(&mut self, patch_set: &PatchSet) -> Result<(), StoreError> {
        let data = encode(patch_set)?;
        self.put(PATCH_SETS, &patch_set.id.to_string(), &data)
    }

    fn approvals_by_revision(&self, revision: &RevisionId) -> Result<Vec<Approval>, StoreError> {
        let t = self.txn.open_table(APPROVALS).map_err(meta_err)?;
        scan_prefix(&t, &revision_prefix(revision))
    }

    fn upsert_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError> {
        for approval in approvals {
            let data = encode(approval)?;
            self.put(APPROVALS, &approval_row_key(approval), &data)?;
        }
        Ok(())
    }

    fn delete_approvals(&mut self, approvals: &[Approval]) -> Result<(), StoreError> {
        let mut t = self.txn.open_table(APPROVALS).map_err(meta_err)?;
        for approval in approvals {
            t.remove(approval_row_key(approval).as_str()).map_err(meta_err)?;
        }
        Ok(())
    }

    fn append_label_event(&mut self, change: &ChangeId, event: &LabelEvent) -> Result<(), StoreError> {
        let seq = self.label_events(change)?.len();
        let data = encode(event)?;
        self.put(LABEL_EVENTS, &format!("{change}/{seq:010}"), &data)
    }

    fn label_events(&self, change: &ChangeId) -> Result<Vec<LabelEvent>, StoreError> {
        let t = self.txn.open_table(LABEL_EVENTS).map_err(meta_err)?;
        scan_prefix(&t, &format!("{change}/"))
    }

    fn add_message(&mut self, message: &HistoryMessage) -> Result<(), StoreError> {
        let key = format!(
            "{}/{:016}/{}",
            message.change_id, message.written_at_ms, message.id
        );
        let data = encode(message)?;
        self.put(MESSAGES, &key, &data)
    }

    fn messages(&self, change: &ChangeId) -> Result<Vec<HistoryMessage>, StoreError> {
        let t = self.txn.open_table(MESSAGES).map_err(meta_err)?;
        scan_prefix(&t, &format!("{change}/"))
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().map_err(meta_err)
    }
}

fn get_row<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match table.get(key).map_err(meta_err)? {
        Some(row) => Ok(Some(decode(row.value())?)),
        None => Ok(None),
    }
}

fn scan_prefix<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    prefix: &str,
) -> Result<Vec<T>, StoreError> {
    let mut rows = Vec::new();
    for entry in table.range(prefix..).map_err(meta_err)? {
        let (key, value) = entry.map_err(meta_err)?;
        if !key.value().starts_with(prefix) {
            break;
        }
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}
