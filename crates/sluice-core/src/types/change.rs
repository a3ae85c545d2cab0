use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{AccountId, ChangeId, RevisionId, SubmissionId};
use crate::types::BranchName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeStatus {
    Open,
    Merged,
    Abandoned,
}

impl ChangeStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub dest: BranchName,
    pub owner: AccountId,
    pub subject: String,
    pub status: ChangeStatus,
    pub current_revision: RevisionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
    #[serde(default)]
    pub reviewers: BTreeSet<AccountId>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Change {
    /// A fresh open change whose first patch set is revision 1.
    pub fn new(dest: BranchName, owner: AccountId, subject: impl Into<String>, now_ms: u64) -> Self {
        let id = ChangeId::new();
        Self {
            id,
            dest,
            owner,
            subject: subject.into(),
            status: ChangeStatus::Open,
            current_revision: RevisionId::new(id, 1),
            submission_id: None,
            reviewers: BTreeSet::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn project(&self) -> &str {
        &self.dest.project
    }
}
