//! Built-in ways of landing a commit on the branch tip.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use sluice_core::id::{ChangeId, ObjectId};
use sluice_core::types::{Classification, Commit, PatchSet};

use crate::ancestor::is_ancestor;
use crate::context::{ChangeContext, RepoContext, SubmitArgs};
use crate::SubmitError;

/// Strategy-specific work done around the pipeline's own phases.
pub trait StrategyEffects: Send {
    /// Integrate the change's commit into `ctx.tip` and classify it.
    fn update_repo(&mut self, _ctx: &mut RepoContext<'_>, _change: ChangeId) -> Result<(), SubmitError> {
        Ok(())
    }

    fn update_change(&mut self, _ctx: &mut ChangeContext<'_>) -> Result<(), SubmitError> {
        Ok(())
    }

    fn post_update(&mut self, _args: &SubmitArgs) -> Result<(), SubmitError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitType {
    FastForwardOnly,
    RebaseIfNecessary,
    CherryPick,
}

impl SubmitType {
    pub fn effects(&self) -> Box<dyn StrategyEffects> {
        match self {
            Self::FastForwardOnly => Box::new(FastForwardOnly),
            Self::RebaseIfNecessary => Box::new(Replay::new(ReplayMode::Rebase)),
            Self::CherryPick => Box::new(Replay::new(ReplayMode::CherryPick)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastForwardOnly => "fast-forward-only",
            Self::RebaseIfNecessary => "rebase-if-necessary",
            Self::CherryPick => "cherry-pick",
        }
    }
}

impl fmt::Display for SubmitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast-forward-only" => Ok(Self::FastForwardOnly),
            "rebase-if-necessary" => Ok(Self::RebaseIfNecessary),
            "cherry-pick" => Ok(Self::CherryPick),
            other => Err(format!("unknown submit type: {other}")),
        }
    }
}

/// Lands commits only when the tip is already in their history.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastForwardOnly;

impl StrategyEffects for FastForwardOnly {
    fn update_repo(&mut self, ctx: &mut RepoContext<'_>, change: ChangeId) -> Result<(), SubmitError> {
        let Some(commit) = ctx.commits.get(&change).map(|c| c.commit) else {
            return Ok(());
        };
        let classification = match ctx.tip.current_tip() {
            Some(tip) if is_ancestor(ctx.repo, &commit, &tip)? => {
                ctx.tip.record_result(commit, commit);
                Classification::AlreadyMerged
            }
            Some(tip) if !is_ancestor(ctx.repo, &tip, &commit)? => Classification::NotFastForward,
            _ => {
                ctx.tip.move_tip_to(commit, commit);
                Classification::CleanMerge
            }
        };
        ctx.commits.set_classification(&change, classification);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Fast-forward when possible, otherwise replay onto the tip.
    Rebase,
    /// Always replay onto the tip as a new commit.
    CherryPick,
}

/// Re-applies a change's diff on top of the current tip, creating a new
/// patch set for the change.
#[derive(Debug)]
pub struct Replay {
    mode: ReplayMode,
    new_patch_set: Option<PatchSet>,
}

impl Replay {
    pub fn new(mode: ReplayMode) -> Self {
        Self {
            mode,
            new_patch_set: None,
        }
    }
}

impl StrategyEffects for Replay {
    fn update_repo(&mut self, ctx: &mut RepoContext<'_>, change: ChangeId) -> Result<(), SubmitError> {
        let Some(resolved) = ctx.commits.get(&change).cloned() else {
            return Ok(());
        };
        let tip = ctx.tip.current_tip();
        if let Some(tip) = tip {
            if is_ancestor(ctx.repo, &resolved.commit, &tip)? {
                ctx.tip.record_result(resolved.commit, resolved.commit);
                ctx.commits.set_classification(&change, Classification::AlreadyMerged);
                return Ok(());
            }
        }
        let fast_forward = match tip {
            None => true,
            Some(tip) => is_ancestor(ctx.repo, &tip, &resolved.commit)?,
        };
        if self.mode == ReplayMode::Rebase && fast_forward {
            ctx.tip.move_tip_to(resolved.commit, resolved.commit);
            ctx.commits.set_classification(&change, Classification::CleanMerge);
            return Ok(());
        }

        let original = ctx.repo.load_commit(&resolved.commit)?;
        if original.parents.len() > 1 {
            ctx.commits.set_classification(&change, Classification::ManualRecursiveMerge);
            return Ok(());
        }
        if let (Some(parent), Some(tip)) = (original.parents.first(), tip) {
            let landed = ctx.tip.merge_result(parent).is_some() || is_ancestor(ctx.repo, parent, &tip)?;
            if !landed {
                debug!(%change, %parent, "parent not on the branch");
                ctx.commits.set_classification(&change, Classification::MissingDependency);
                return Ok(());
            }
        }
        let base = match original.parents.first() {
            Some(parent) => ctx.repo.load_commit(parent)?.files,
            None => BTreeMap::new(),
        };
        let ours = match tip {
            Some(tip) => ctx.repo.load_commit(&tip)?.files,
            None => BTreeMap::new(),
        };
        let files = match three_way(&base, &ours, &original.files) {
            Ok(files) => files,
            Err(path) => {
                debug!(%change, path, "replay conflict");
                let conflict = match self.mode {
                    ReplayMode::Rebase => Classification::RebaseMergeConflict,
                    ReplayMode::CherryPick => Classification::PathConflict,
                };
                ctx.commits.set_classification(&change, conflict);
                return Ok(());
            }
        };

        let (message, classification) = match self.mode {
            ReplayMode::Rebase => (original.message.clone(), Classification::CleanRebase),
            ReplayMode::CherryPick => (
                format!("{}\n\n(cherry picked from commit {})", original.message, resolved.commit),
                Classification::CleanPick,
            ),
        };
        let replayed = Commit {
            parents: tip.into_iter().collect(),
            author: original.author,
            message,
            files,
            created_at_ms: ctx.when_ms,
        };
        let new_id = ctx.repo.store_commit(&replayed)?;
        let new_revision = resolved.revision.next();
        ctx.tip.move_tip_to(new_id, new_id);
        // Later changes in the batch may have the original commit as parent.
        ctx.tip.record_result(resolved.commit, new_id);
        if let Some(entry) = ctx.commits.get_mut(&change) {
            entry.commit = new_id;
            entry.revision = new_revision;
            entry.classification = Some(classification);
        }
        self.new_patch_set = Some(PatchSet {
            id: new_revision,
            commit: new_id,
            uploader: ctx.caller,
            created_at_ms: ctx.when_ms,
        });
        Ok(())
    }

    fn update_change(&mut self, ctx: &mut ChangeContext<'_>) -> Result<(), SubmitError> {
        if let Some(patch_set) = &self.new_patch_set {
            ctx.txn.insert_patch_set(patch_set)?;
            ctx.change.current_revision = patch_set.id;
        }
        Ok(())
    }
}

/// File-level three-way merge. Returns the first conflicting path on failure.
fn three_way(
    base: &BTreeMap<String, String>,
    ours: &BTreeMap<String, String>,
    theirs: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, String> {
    let paths: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    let mut merged = BTreeMap::new();
    for path in paths {
        let (b, o, t) = (base.get(path), ours.get(path), theirs.get(path));
        let pick = if t == b || o == t {
            o
        } else if o == b {
            t
        } else {
            return Err(path.clone());
        };
        if let Some(content) = pick {
            merged.insert(path.clone(), content.clone());
        }
    }
    Ok(merged)
}
