use serde::{Deserialize, Serialize};

use crate::id::{AccountId, ChangeId, MessageId, RevisionId};

/// Append-only note on a change. Submit outcomes are written without an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub change_id: ChangeId,
    pub revision: RevisionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AccountId>,
    pub written_at_ms: u64,
    pub text: String,
}
