use std::path::PathBuf;

use clap::Args;

use sluice_core::types::{validate_ref_name, Commit, REFS_HEADS};

use crate::config::{now_ms, open_repo, resolve_commit};

#[derive(Args)]
pub struct CommitArgs {
    /// Files to record; stored under their path relative to the repo root
    files: Vec<PathBuf>,
    /// Parent commit (id, ref or branch); repeatable
    #[arg(short, long)]
    parent: Vec<String>,
    /// Commit message
    #[arg(short, long)]
    message: String,
    /// Author name
    #[arg(short, long, default_value = "anonymous")]
    author: String,
    /// Point this ref (or branch) at the new commit
    #[arg(long)]
    update_ref: Option<String>,
}

pub fn run(args: CommitArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let parents = args
        .parent
        .iter()
        .map(|p| resolve_commit(&repo, p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Start from the first parent's tree so unchanged files carry over.
    let mut files = match parents.first() {
        Some(parent) => repo.load_commit(parent)?.files,
        None => Default::default(),
    };
    let cwd = std::env::current_dir()?;
    for path in &args.files {
        let absolute = cwd.join(path);
        let relative = absolute
            .strip_prefix(repo.root())
            .map_err(|_| anyhow::anyhow!("{} is outside the repository", path.display()))?;
        let key = relative.to_string_lossy().replace('\\', "/");
        files.insert(key, std::fs::read_to_string(&absolute)?);
    }

    let commit = Commit {
        parents,
        author: args.author,
        message: args.message,
        files,
        created_at_ms: now_ms()?,
    };
    let id = repo.store_commit(&commit)?;
    println!("{id}");

    if let Some(target) = args.update_ref {
        let ref_name = if target.starts_with("refs/") {
            target
        } else {
            format!("{REFS_HEADS}{target}")
        };
        validate_ref_name(&ref_name)?;
        repo.set_ref(&ref_name, &id)?;
        println!("Updated {ref_name}");
    }
    Ok(())
}
