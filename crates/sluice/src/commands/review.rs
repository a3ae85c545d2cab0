use clap::Args;

use sluice_core::id::{AccountId, ChangeId};
use sluice_core::types::{Approval, LabelEvent, LabelId};
use sluice_store::MetaStore;

use crate::config::{now_ms, open_repo};

#[derive(Args)]
pub struct ReviewArgs {
    /// Change ID (ULID)
    change: String,
    /// Voting account
    #[arg(short, long)]
    account: u32,
    /// Votes as LABEL=VALUE, e.g. Code-Review=+2
    #[arg(short, long = "label", value_parser = parse_vote)]
    labels: Vec<(String, i16)>,
}

fn parse_vote(s: &str) -> Result<(String, i16), String> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got {s}"))?;
    let value = value
        .trim_start_matches('+')
        .parse::<i16>()
        .map_err(|e| format!("bad vote value in {s}: {e}"))?;
    if label.is_empty() || LabelId::new(label).is_submit() {
        return Err(format!("cannot vote on label {label:?}"));
    }
    Ok((label.to_string(), value))
}

pub fn run(args: ReviewArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let meta = repo.open_meta_store()?;
    let id = ChangeId::from_string(&args.change)?;
    let account = AccountId(args.account);
    let now = now_ms()?;

    let mut txn = meta.begin()?;
    let mut change = txn
        .change(&id)?
        .ok_or_else(|| anyhow::anyhow!("change not found: {id}"))?;
    if !change.status.is_open() {
        anyhow::bail!("change {id} is {}", change.status.as_str());
    }
    let revision = change.current_revision;
    let votes: Vec<Approval> = args
        .labels
        .iter()
        .map(|(label, value)| Approval::new(revision, account, LabelId::new(label), *value, now))
        .collect();
    txn.upsert_approvals(&votes)?;
    for vote in &votes {
        txn.append_label_event(
            &id,
            &LabelEvent {
                revision,
                account,
                label: vote.label().clone(),
                value: Some(vote.value),
                at_ms: now,
            },
        )?;
    }
    change.reviewers.insert(account);
    change.updated_at_ms = now;
    txn.save_change(&change)?;
    txn.commit()?;
    println!("Recorded {} vote(s) on {revision}", votes.len());
    Ok(())
}
