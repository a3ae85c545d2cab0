use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash::{content_hash, ObjectKind};
use crate::id::{ChangeId, ObjectId, RevisionId};
use crate::CoreError;

/// A snapshot in the commit graph. File contents are kept inline as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub parents: Vec<ObjectId>,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    pub created_at_ms: u64,
}

impl Commit {
    pub fn serialize_payload(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn deserialize_payload(data: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(data).map_err(|e| CoreError::Deserialization(e.to_string()))
    }

    pub fn id(&self) -> Result<ObjectId, CoreError> {
        Ok(content_hash(ObjectKind::Commit, &self.serialize_payload()?))
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// The resolver's verdict on how a change's commit was incorporated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    CleanMerge,
    CleanRebase,
    CleanPick,
    AlreadyMerged,
    PathConflict,
    RebaseMergeConflict,
    ManualRecursiveMerge,
    MissingDependency,
    NotFastForward,
}

impl Classification {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CleanMerge => "Change has been successfully merged",
            Self::CleanRebase => "Change has been successfully rebased",
            Self::CleanPick => "Change has been successfully cherry-picked",
            Self::AlreadyMerged => "",
            Self::PathConflict => {
                "Change could not be merged due to a path conflict. Please rebase the change \
                 locally and upload the rebased commit for review."
            }
            Self::RebaseMergeConflict => {
                "Change could not be merged due to a conflict. Please rebase the change \
                 locally and upload the rebased commit for review."
            }
            Self::ManualRecursiveMerge => {
                "The change requires a local merge to resolve. Please merge (or rebase) the \
                 change locally and upload the resolution for review."
            }
            Self::MissingDependency => "Depends on a change that has not been submitted.",
            Self::NotFastForward => {
                "Project policy requires all submissions to be a fast-forward. Please rebase \
                 the change locally and upload again for review."
            }
        }
    }

    /// True for outcomes that land the change.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            Self::CleanMerge | Self::CleanRebase | Self::CleanPick | Self::AlreadyMerged
        )
    }
}

/// A change's candidate commit together with the resolver's classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub change_id: ChangeId,
    pub commit: ObjectId,
    /// Patch set the commit belongs to. Rebase and cherry-pick move this to
    /// the revision they create.
    pub revision: RevisionId,
    pub classification: Option<Classification>,
}

impl ResolvedCommit {
    pub fn new(revision: RevisionId, commit: ObjectId) -> Self {
        Self {
            change_id: revision.change_id,
            commit,
            revision,
            classification: None,
        }
    }

    pub fn classified(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(msg: &str) -> Commit {
        Commit {
            parents: vec![],
            author: "alice".into(),
            message: msg.into(),
            files: BTreeMap::new(),
            created_at_ms: 1,
        }
    }

    #[test]
    fn commit_id_follows_content() {
        assert_eq!(commit("a").id().unwrap(), commit("a").id().unwrap());
        assert_ne!(commit("a").id().unwrap(), commit("b").id().unwrap());
    }

    #[test]
    fn only_landing_outcomes_are_clean() {
        assert!(Classification::CleanPick.is_clean());
        assert!(Classification::AlreadyMerged.is_clean());
        assert!(!Classification::PathConflict.is_clean());
        assert!(!Classification::NotFastForward.is_clean());
    }
}
