use std::collections::BTreeMap;
use std::sync::Arc;

use sluice_core::id::{AccountId, ObjectId};
use sluice_core::types::*;
use sluice_policy::RangeNormalizer;
use sluice_store::project::PROJECT_CONFIG_FILE;
use sluice_store::{MetaStore, ProjectCache, RedbMetaStore, SluiceRepo, TipCache};
use sluice_submit::dispatch::OutboxNotifier;
use sluice_submit::{BatchOutcome, StaticAccounts, SubmitArgs, SubmitBatch, SubmitError, SubmitType};

const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);

const PROJECT_TOML: &str = r#"
[project]
description = "Integration project"

[[label]]
name = "Code-Review"
min = -2
max = 2

[[label]]
name = "Verified"
min = -1
max = 1

[[access]]
label = "Code-Review"
account = 2
min = -2
max = 2

[[access]]
label = "Verified"
account = 2
min = -1
max = 1
"#;

struct Env {
    tmp: tempfile::TempDir,
    repo: Arc<SluiceRepo>,
    meta: RedbMetaStore,
    main: BranchName,
    base: ObjectId,
}

fn commit(repo: &SluiceRepo, parents: Vec<ObjectId>, files: &[(&str, &str)], message: &str) -> ObjectId {
    let files: BTreeMap<String, String> = files
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();
    repo.store_commit(&Commit {
        parents,
        author: "Bob".into(),
        message: message.into(),
        files,
        created_at_ms: 1,
    })
    .unwrap()
}

fn setup() -> Env {
    let tmp = tempfile::tempdir().unwrap();
    let mut repo = SluiceRepo::init(tmp.path(), "demo").unwrap();
    let mut config = repo.config().clone();
    config.accounts = vec![Account::new(ALICE).with_full_name("Alice"), Account::new(BOB)];
    repo.save_config(config).unwrap();

    let cfg = commit(&repo, vec![], &[(PROJECT_CONFIG_FILE, PROJECT_TOML)], "config");
    repo.set_ref(REFS_CONFIG, &cfg).unwrap();
    let base = commit(&repo, vec![], &[("src/lib.rs", "fn a() {}\n")], "initial");
    let main = BranchName::new("demo", "main").unwrap();
    repo.set_ref(&main.ref_name, &base).unwrap();
    let meta = repo.open_meta_store().unwrap();
    Env {
        tmp,
        repo: Arc::new(repo),
        meta,
        main,
        base,
    }
}

impl Env {
    fn args(&self) -> SubmitArgs {
        SubmitArgs::new(
            ALICE,
            5_000,
            Arc::new(ProjectCache::new(self.repo.clone())),
            self.repo.clone(),
            tokio::runtime::Handle::current(),
        )
        .with_accounts(Arc::new(StaticAccounts::new(self.repo.config().accounts.clone())))
        .with_normalizer(Arc::new(RangeNormalizer))
    }

    /// Open change with Code-Review+2 and Verified+1 from Bob.
    fn change(&self, dest: &BranchName, commit: ObjectId) -> Change {
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
        txn.upsert_approvals(&[
            Approval::new(rev, BOB, LabelId::new("Code-Review"), 2, 20),
            Approval::new(rev, BOB, LabelId::new("Verified"), 1, 21),
        ])
        .unwrap();
        txn.commit().unwrap();
        change
    }

    fn submit(&self, args: SubmitArgs, changes: &[&Change], submit_type: SubmitType) -> Result<BatchOutcome, SubmitError> {
        let dest = changes[0].dest.clone();
        let mut batch = SubmitBatch::new(&self.repo, &self.meta, args, dest)?;
        for change in changes {
            let ps = self.meta.patch_set(&change.current_revision).unwrap().unwrap();
            batch.add(change, ResolvedCommit::new(ps.id, ps.commit), submit_type.effects())?;
        }
        batch.execute()
    }

    fn tip(&self) -> Option<ObjectId> {
        self.repo.get_ref(&self.main.ref_name).unwrap()
    }
}

#[tokio::test]
async fn clean_merge_by_alice() {
    let env = setup();
    let c1 = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let change = env.change(&env.main, c1);

    env.submit(env.args(), &[&change], SubmitType::FastForwardOnly).unwrap();

    assert_eq!(env.tip(), Some(c1));
    let stored = env.meta.change(&change.id).unwrap().unwrap();
    assert_eq!(stored.status, ChangeStatus::Merged);
    assert!(stored.reviewers.contains(&ALICE));
    let messages = env.meta.messages(&change.id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Change has been successfully merged by Alice");
    assert_eq!(messages[0].revision, change.current_revision);
    assert_eq!(messages[0].author, None);

    let reflog = sluice_store::reflog::read_reflog(env.repo.layout(), &env.main.ref_name).unwrap();
    assert_eq!(reflog.last().map(|l| l.new), Some(c1));
}

#[tokio::test]
async fn clean_rebase_lands_revision_two() {
    let env = setup();
    let upstream = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn a() {}\n"), ("README", "hi\n")], "readme");
    env.repo.set_ref(&env.main.ref_name, &upstream).unwrap();
    let c1 = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let change = env.change(&env.main, c1);
    let rev1 = change.current_revision;

    env.submit(env.args(), &[&change], SubmitType::RebaseIfNecessary).unwrap();

    let tip = env.tip().unwrap();
    let stored = env.meta.change(&change.id).unwrap().unwrap();
    let rev2 = rev1.next();
    assert_eq!(stored.current_revision, rev2);
    assert_eq!(env.meta.patch_set(&rev2).unwrap().unwrap().commit, tip);

    let messages = env.meta.messages(&change.id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].revision, rev2);
    assert_eq!(
        messages[0].text,
        format!("Change has been successfully rebased as {tip} by Alice")
    );

    let labels = |rev| -> Vec<(String, i16)> {
        let mut v: Vec<_> = env
            .meta
            .approvals_by_revision(&rev)
            .unwrap()
            .into_iter()
            .map(|a| (a.label().to_string(), a.value))
            .collect();
        v.sort();
        v
    };
    assert_eq!(labels(rev1), labels(rev2));
    assert_eq!(
        labels(rev2),
        vec![
            ("Code-Review".to_string(), 2),
            ("SUBM".to_string(), 1),
            ("Verified".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn already_merged_is_silent() {
    let env = setup();
    let change = env.change(&env.main, env.base);

    let outcome = env.submit(env.args(), &[&change], SubmitType::CherryPick).unwrap();

    assert!(outcome.ref_updates.is_empty());
    assert_eq!(env.tip(), Some(env.base));
    assert_eq!(env.meta.change(&change.id).unwrap().unwrap().status, ChangeStatus::Merged);
    assert!(env.meta.messages(&change.id).unwrap().is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let env = setup();
    let config_ref = BranchName::new("demo", REFS_CONFIG).unwrap();
    let current = env.repo.get_ref(REFS_CONFIG).unwrap().unwrap();
    let broken = commit(
        &env.repo,
        vec![current],
        &[(PROJECT_CONFIG_FILE, "[[label]]\nname = \"SUBM\"\nmin = 0\nmax = 1\n")],
        "reserve submit label",
    );
    let change = env.change(&config_ref, broken);
    let votes_before = env.meta.approvals_by_revision(&change.current_revision).unwrap();
    assert!(!votes_before.is_empty());

    let err = env
        .submit(env.args(), &[&change], SubmitType::FastForwardOnly)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Submit would store invalid project configuration {broken} for demo")
    );
    assert!(!err.is_retryable());
    assert_eq!(env.repo.get_ref(REFS_CONFIG).unwrap(), Some(current));
    assert_eq!(env.meta.change(&change.id).unwrap().unwrap().status, ChangeStatus::Open);
    assert_eq!(
        env.meta.approvals_by_revision(&change.current_revision).unwrap(),
        votes_before
    );
    assert!(env.meta.label_events(&change.id).unwrap().is_empty());
    assert!(env.meta.messages(&change.id).unwrap().is_empty());
}

#[tokio::test]
async fn outbox_receives_one_line_per_change() {
    let env = setup();
    let first = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let second = commit(&env.repo, vec![first], &[("src/lib.rs", "fn c() {}\n")], "c");
    let a = env.change(&env.main, first);
    let b = env.change(&env.main, second);
    let outbox = env.tmp.path().join(".sluice").join("outbox").join("change-merged.jsonl");
    let tip_cache = Arc::new(TipCache::new());
    tip_cache.record("demo", &env.main.ref_name, env.base);
    let args = env
        .args()
        .with_notifier(Arc::new(OutboxNotifier::new(&outbox)))
        .with_tip_cache(tip_cache.clone());

    let mut outcome = env.submit(args, &[&a, &b], SubmitType::FastForwardOnly).unwrap();
    outcome.wait_for_notifications().await;

    assert_eq!(outcome.merged, vec![a.id, b.id]);
    assert_eq!(tip_cache.get("demo", &env.main.ref_name), Some(second));
    let text = std::fs::read_to_string(&outbox).unwrap();
    let changes: Vec<String> = text
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["change"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(changes.len(), 2);
    assert!(changes.contains(&a.id.to_string()));
    assert!(changes.contains(&b.id.to_string()));
}

#[tokio::test]
async fn metadata_survives_reopen() {
    let env = setup();
    let c1 = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let change = env.change(&env.main, c1);
    let outcome = env.submit(env.args(), &[&change], SubmitType::FastForwardOnly).unwrap();
    let Env { tmp, meta, .. } = env;
    drop(meta);

    let reopened = SluiceRepo::open(tmp.path()).unwrap().open_meta_store().unwrap();
    let stored = reopened.change(&change.id).unwrap().unwrap();
    assert_eq!(stored.status, ChangeStatus::Merged);
    assert_eq!(stored.submission_id, Some(outcome.submission_id));
    let events = reopened.label_events(&change.id).unwrap();
    assert!(events.iter().any(|e| e.label.is_submit() && e.account == ALICE));
}

#[cfg(unix)]
#[tokio::test]
async fn command_hook_sees_merge_result() {
    use std::os::unix::fs::PermissionsExt;

    let env = setup();
    let out = env.tmp.path().join("hook.out");
    let script = env.tmp.path().join("hook.sh");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\necho \"$SLUICE_CHANGE $SLUICE_NEW_REV $SLUICE_SUBMITTER\" > {}\n",
            out.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let c1 = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let change = env.change(&env.main, c1);
    let args = env
        .args()
        .with_hook(Arc::new(sluice_submit::dispatch::CommandHook::new(&script)));
    let mut outcome = env.submit(args, &[&change], SubmitType::FastForwardOnly).unwrap();
    outcome.wait_for_notifications().await;

    let line = std::fs::read_to_string(&out).unwrap();
    assert_eq!(line.trim(), format!("{} {} Alice", change.id, c1.to_hex()));
}

#[cfg(unix)]
#[tokio::test]
async fn slow_hook_does_not_delay_submit() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    let env = setup();
    let script = env.tmp.path().join("slow.sh");
    std::fs::write(&script, "#!/bin/sh\nsleep 2\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let c1 = commit(&env.repo, vec![env.base], &[("src/lib.rs", "fn b() {}\n")], "b");
    let change = env.change(&env.main, c1);
    let args = env
        .args()
        .with_hook(Arc::new(sluice_submit::dispatch::CommandHook::new(&script)));

    let started = Instant::now();
    let mut outcome = env.submit(args, &[&change], SubmitType::FastForwardOnly).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(env.tip(), Some(c1));
    assert_eq!(env.meta.change(&change.id).unwrap().unwrap().status, ChangeStatus::Merged);

    outcome.wait_for_notifications().await;
    assert!(started.elapsed() >= Duration::from_secs(2));
}
