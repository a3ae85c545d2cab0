use sluice_core::id::AccountId;
use sluice_core::types::{AccessGrants, PermissionRange};

/// Answers "what may this account vote on this label right now".
pub trait PermissionSource {
    fn permitted_range(&self, label: &str, account: AccountId) -> Option<PermissionRange>;
}

impl PermissionSource for AccessGrants {
    fn permitted_range(&self, label: &str, account: AccountId) -> Option<PermissionRange> {
        self.range(label, account)
    }
}
