use serde::{Deserialize, Serialize};

use crate::id::{AccountId, ObjectId, RevisionId};

/// Immutable revision of a change, pointing at its commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub id: RevisionId,
    pub commit: ObjectId,
    pub uploader: AccountId,
    pub created_at_ms: u64,
}
