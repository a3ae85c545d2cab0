use clap::{Args, Subcommand};

use sluice_core::id::{AccountId, ChangeId};
use sluice_core::types::{BranchName, Change, PatchSet};
use sluice_store::MetaStore;

use crate::config::{now_ms, open_repo, resolve_commit};
use crate::output::{header, kv};

#[derive(Args)]
pub struct ChangeArgs {
    #[command(subcommand)]
    command: ChangeCommand,
}

#[derive(Subcommand)]
enum ChangeCommand {
    /// Create a change whose first revision is an existing commit
    Create {
        /// Commit for revision 1 (id, ref or branch)
        #[arg(short, long)]
        commit: String,
        /// Destination branch
        #[arg(short, long, default_value = "main")]
        branch: String,
        /// Owning account
        #[arg(short, long)]
        owner: u32,
        #[arg(short, long)]
        subject: String,
    },
    /// Upload a new revision of a change
    Upload {
        id: String,
        #[arg(short, long)]
        commit: String,
        #[arg(short, long)]
        uploader: u32,
    },
    /// Show a change with its votes and messages
    Show {
        /// Change ID (ULID)
        id: String,
    },
}

pub fn run(args: ChangeArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let meta = repo.open_meta_store()?;
    match args.command {
        ChangeCommand::Create {
            commit,
            branch,
            owner,
            subject,
        } => {
            let commit = resolve_commit(&repo, &commit)?;
            let dest = BranchName::new(repo.project(), &branch)?;
            let now = now_ms()?;
            let change = Change::new(dest, AccountId(owner), subject, now);
            let mut txn = meta.begin()?;
            txn.save_change(&change)?;
            txn.insert_patch_set(&PatchSet {
                id: change.current_revision,
                commit,
                uploader: change.owner,
                created_at_ms: now,
            })?;
            txn.commit()?;
            println!("Created change: {}", change.id);
            println!("  Branch: {}", change.dest);
            println!("  Revision: {} at {}", change.current_revision, commit.short());
        }
        ChangeCommand::Upload {
            id,
            commit,
            uploader,
        } => {
            let id = ChangeId::from_string(&id)?;
            let commit = resolve_commit(&repo, &commit)?;
            let now = now_ms()?;
            let mut txn = meta.begin()?;
            let mut change = txn
                .change(&id)?
                .ok_or_else(|| anyhow::anyhow!("change not found: {id}"))?;
            if !change.status.is_open() {
                anyhow::bail!("change {id} is {}", change.status.as_str());
            }
            change.current_revision = change.current_revision.next();
            change.updated_at_ms = now;
            txn.insert_patch_set(&PatchSet {
                id: change.current_revision,
                commit,
                uploader: AccountId(uploader),
                created_at_ms: now,
            })?;
            txn.save_change(&change)?;
            txn.commit()?;
            println!("Uploaded revision {}", change.current_revision);
        }
        ChangeCommand::Show { id } => {
            let id = ChangeId::from_string(&id)?;
            let change = meta
                .change(&id)?
                .ok_or_else(|| anyhow::anyhow!("change not found: {id}"))?;
            println!("{}", header(&format!("Change {}", change.id)));
            println!("{}", kv("Subject", &change.subject));
            println!("{}", kv("Branch", &change.dest.to_string()));
            println!("{}", kv("Status", change.status.as_str()));
            println!("{}", kv("Revision", &change.current_revision.to_string()));
            if let Some(ps) = meta.patch_set(&change.current_revision)? {
                println!("{}", kv("Commit", &ps.commit.to_hex()));
            }
            if let Some(sid) = change.submission_id {
                println!("{}", kv("Submission", &sid.to_string()));
            }
            let reviewers: Vec<String> = change.reviewers.iter().map(|a| a.to_string()).collect();
            println!("{}", kv("Reviewers", &reviewers.join(", ")));

            for approval in meta.approvals_by_revision(&change.current_revision)? {
                println!("  {} {}={:+}", approval.account(), approval.label(), approval.value);
            }
            for message in meta.messages(&id)? {
                println!("  [{}] {}", message.revision, message.text);
            }
        }
    }
    Ok(())
}
