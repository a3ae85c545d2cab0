use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{AccountId, RevisionId};

/// Name of the synthetic label recorded when a change is submitted.
pub const SUBMIT_LABEL: &str = "SUBM";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(String);

impl LabelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn submit() -> Self {
        Self(SUBMIT_LABEL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_submit(&self) -> bool {
        self.0 == SUBMIT_LABEL
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalKey {
    pub revision: RevisionId,
    pub account: AccountId,
    pub label: LabelId,
}

/// A vote on one label of one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub key: ApprovalKey,
    pub value: i16,
    pub granted_ms: u64,
}

impl Approval {
    pub fn new(
        revision: RevisionId,
        account: AccountId,
        label: LabelId,
        value: i16,
        granted_ms: u64,
    ) -> Self {
        Self {
            key: ApprovalKey {
                revision,
                account,
                label,
            },
            value,
            granted_ms,
        }
    }

    pub fn revision(&self) -> RevisionId {
        self.key.revision
    }

    pub fn account(&self) -> AccountId {
        self.key.account
    }

    pub fn label(&self) -> &LabelId {
        &self.key.label
    }

    pub fn is_submit(&self) -> bool {
        self.key.label.is_submit()
    }

    /// Same vote re-keyed onto another revision. Value and grant time are kept.
    pub fn with_revision(&self, revision: RevisionId) -> Self {
        let mut copy = self.clone();
        copy.key.revision = revision;
        copy
    }
}

/// One entry of a change's per-label history. `value == None` records removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub revision: RevisionId,
    pub account: AccountId,
    pub label: LabelId,
    pub value: Option<i16>,
    pub at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ChangeId;

    #[test]
    fn with_revision_only_touches_revision() {
        let change = ChangeId::new();
        let a = Approval::new(
            RevisionId::new(change, 1),
            AccountId(7),
            LabelId::new("Code-Review"),
            2,
            1000,
        );
        let b = a.with_revision(RevisionId::new(change, 2));
        assert_eq!(b.revision().number, 2);
        assert_eq!(b.account(), a.account());
        assert_eq!(b.label(), a.label());
        assert_eq!(b.value, 2);
        assert_eq!(b.granted_ms, 1000);
    }

    #[test]
    fn submit_label_detection() {
        assert!(LabelId::submit().is_submit());
        assert!(!LabelId::new("Verified").is_submit());
    }
}
