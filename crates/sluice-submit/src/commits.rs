use std::collections::{BTreeMap, HashMap};

use sluice_core::id::ChangeId;
use sluice_core::types::{Classification, ResolvedCommit};

/// Per-batch registry of resolved commits and the problems met on the way.
#[derive(Debug, Default)]
pub struct CommitStatus {
    commits: HashMap<ChangeId, ResolvedCommit>,
    problems: BTreeMap<ChangeId, String>,
}

impl CommitStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, commit: ResolvedCommit) {
        self.commits.insert(commit.change_id, commit);
    }

    pub fn get(&self, change: &ChangeId) -> Option<&ResolvedCommit> {
        self.commits.get(change)
    }

    pub fn get_mut(&mut self, change: &ChangeId) -> Option<&mut ResolvedCommit> {
        self.commits.get_mut(change)
    }

    pub fn set_classification(&mut self, change: &ChangeId, classification: Classification) {
        if let Some(commit) = self.commits.get_mut(change) {
            commit.classification = Some(classification);
        }
    }

    pub fn log_problem(&mut self, change: ChangeId, problem: impl Into<String>) {
        self.problems.insert(change, problem.into());
    }

    pub fn problems(&self) -> &BTreeMap<ChangeId, String> {
        &self.problems
    }

    /// Changes whose classification would not land them, with the reason.
    pub fn unmergeable(&self) -> BTreeMap<ChangeId, String> {
        self.commits
            .values()
            .filter_map(|c| match c.classification {
                Some(cls) if cls.is_clean() => None,
                Some(cls) => Some((c.change_id, cls.message().to_string())),
                None => Some((c.change_id, "no merge outcome recorded".to_string())),
            })
            .collect()
    }
}
