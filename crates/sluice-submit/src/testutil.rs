use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::TempDir;

use sluice_core::id::{AccountId, ObjectId};
use sluice_core::types::{
    Account, Approval, BranchName, Change, Commit, LabelId, PatchSet, ResolvedCommit, REFS_CONFIG,
};
use sluice_store::project::PROJECT_CONFIG_FILE;
use sluice_store::{MemoryMetaStore, MetaStore, ProjectCache, SluiceRepo};

use crate::collab::StaticAccounts;
use crate::context::SubmitArgs;

pub(crate) const ALICE: AccountId = AccountId(1);
pub(crate) const BOB: AccountId = AccountId(2);

pub(crate) const PROJECT_TOML: &str = r#"
[project]
description = "Demo project"

[[label]]
name = "Code-Review"
min = -2
max = 2

[[access]]
label = "Code-Review"
account = 2
min = -2
max = 2
"#;

pub(crate) struct Fixture {
    _tmp: TempDir,
    pub repo: Arc<SluiceRepo>,
    pub meta: MemoryMetaStore,
    pub main: BranchName,
    pub base: ObjectId,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Arc::new(SluiceRepo::init(tmp.path(), "demo").unwrap());
        let config = store(&repo, vec![], &[(PROJECT_CONFIG_FILE, PROJECT_TOML)], "config");
        repo.set_ref(REFS_CONFIG, &config).unwrap();
        let base = store(&repo, vec![], &[("README", "hello\n")], "initial");
        let main = BranchName::new("demo", "main").unwrap();
        repo.set_ref(&main.ref_name, &base).unwrap();
        Self {
            _tmp: tmp,
            repo,
            meta: MemoryMetaStore::new(),
            main,
            base,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn args(&self) -> SubmitArgs {
        let accounts = StaticAccounts::new([
            Account::new(ALICE).with_full_name("Alice"),
            Account::new(BOB),
        ]);
        SubmitArgs::new(
            ALICE,
            1_000,
            Arc::new(ProjectCache::new(self.repo.clone())),
            self.repo.clone(),
            tokio::runtime::Handle::current(),
        )
        .with_accounts(Arc::new(accounts))
    }

    pub fn commit(&self, parents: Vec<ObjectId>, files: &[(&str, &str)], message: &str) -> ObjectId {
        store(&self.repo, parents, files, message)
    }

    /// Open change on `dest` at `commit`, with a Code-Review +2 from Bob.
    pub fn change(&self, dest: &BranchName, commit: ObjectId) -> (Change, ResolvedCommit) {
        let change = Change::new(dest.clone(), BOB, "subject", 10);
        let rev = change.current_revision;
        let mut txn = self.meta.begin().unwrap();
        txn.save_change(&change).unwrap();
        txn.insert_patch_set(&PatchSet {
            id: rev,
            commit,
            uploader: BOB,
            created_at_ms: 10,
        })
        .unwrap();
        txn.upsert_approvals(&[Approval::new(rev, BOB, LabelId::new("Code-Review"), 2, 20)])
            .unwrap();
        txn.commit().unwrap();
        (change, ResolvedCommit::new(rev, commit))
    }
}

fn store(repo: &SluiceRepo, parents: Vec<ObjectId>, files: &[(&str, &str)], message: &str) -> ObjectId {
    let files: BTreeMap<String, String> = files
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();
    repo.store_commit(&Commit {
        parents,
        author: "Bob".into(),
        message: message.into(),
        files,
        created_at_ms: 5,
    })
    .unwrap()
}
