use std::sync::Arc;

use clap::Args;

use sluice_core::id::{AccountId, ChangeId};
use sluice_core::types::ResolvedCommit;
use sluice_store::{MetaStore, ProjectCache};
use sluice_submit::dispatch::{CommandHook, OutboxNotifier};
use sluice_submit::{StaticAccounts, SubmitBatch, SubmitType};

use crate::config::{now_ms, open_repo};

#[derive(Args)]
pub struct SubmitArgs {
    /// Change IDs, submitted in the given order
    #[arg(required = true)]
    changes: Vec<String>,
    /// Submitting account
    #[arg(long = "as")]
    caller: u32,
    /// How commits are landed on the branch
    #[arg(short, long, default_value = "fast-forward-only")]
    strategy: SubmitType,
}

pub async fn run(args: SubmitArgs) -> anyhow::Result<()> {
    let repo = Arc::new(open_repo()?);
    let meta = repo.open_meta_store()?;
    let config = repo.config().clone();

    let ids = args
        .changes
        .iter()
        .map(|s| ChangeId::from_string(s))
        .collect::<Result<Vec<_>, _>>()?;
    let mut changes = Vec::with_capacity(ids.len());
    for id in &ids {
        let change = meta
            .change(id)?
            .ok_or_else(|| anyhow::anyhow!("change not found: {id}"))?;
        let patch_set = meta
            .patch_set(&change.current_revision)?
            .ok_or_else(|| anyhow::anyhow!("no commit for revision {}", change.current_revision))?;
        changes.push((change, patch_set));
    }
    let Some((first, _)) = changes.first() else {
        anyhow::bail!("nothing to submit");
    };
    let dest = first.dest.clone();
    tracing::debug!(changes = changes.len(), strategy = %args.strategy, branch = %dest, "submitting");

    let mut submit_args = sluice_submit::SubmitArgs::new(
        AccountId(args.caller),
        now_ms()?,
        Arc::new(ProjectCache::new(repo.clone())),
        repo.clone(),
        tokio::runtime::Handle::current(),
    )
    .with_accounts(Arc::new(StaticAccounts::new(config.accounts.clone())));
    if config.notify.outbox {
        let outbox = repo.layout().outbox_dir().join("change-merged.jsonl");
        submit_args = submit_args.with_notifier(Arc::new(OutboxNotifier::new(outbox)));
    }
    if let Some(hook) = &config.hooks.change_merged {
        let program = if hook.is_absolute() {
            hook.clone()
        } else {
            repo.root().join(hook)
        };
        let mut hook = CommandHook::new(program);
        if let Some(secs) = config.hooks.timeout_secs {
            hook = hook.with_timeout(std::time::Duration::from_secs(secs));
        }
        submit_args = submit_args.with_hook(Arc::new(hook));
    }

    let mut batch = SubmitBatch::new(&repo, &meta, submit_args, dest)?;
    for (change, patch_set) in &changes {
        batch.add(
            change,
            ResolvedCommit::new(patch_set.id, patch_set.commit),
            args.strategy.effects(),
        )?;
    }
    let mut outcome = batch.execute()?;
    outcome.wait_for_notifications().await;

    println!("Submission {}", outcome.submission_id);
    for command in &outcome.ref_updates {
        println!("  {command}");
    }
    for id in &outcome.merged {
        match outcome.problems.get(id) {
            Some(problem) => println!("  merged {id} (warning: {problem})"),
            None => println!("  merged {id}"),
        }
    }
    Ok(())
}
