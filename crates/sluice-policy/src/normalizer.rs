use sluice_core::types::{Approval, LabelTypes};

use crate::permissions::PermissionSource;

/// Votes split by what normalization did to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedApprovals {
    /// Valid and stored value already correct.
    pub unchanged: Vec<Approval>,
    /// Valid but clamped; carries the new value.
    pub updated: Vec<Approval>,
    /// No longer valid: unknown label or no permission.
    pub deleted: Vec<Approval>,
}

impl NormalizedApprovals {
    /// Everything that survives normalization: unchanged followed by updated.
    pub fn normalized(&self) -> Vec<Approval> {
        self.unchanged
            .iter()
            .chain(self.updated.iter())
            .cloned()
            .collect()
    }
}

/// Re-evaluates votes against the labels and permissions in force now.
/// Must be a pure function of its inputs.
pub trait LabelNormalizer: Send + Sync {
    fn normalize(
        &self,
        labels: &LabelTypes,
        permissions: &dyn PermissionSource,
        approvals: Vec<Approval>,
    ) -> NormalizedApprovals;
}

/// Clamps each vote first to its label's range, then to the voter's granted
/// range. The submit label is never touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeNormalizer;

impl LabelNormalizer for RangeNormalizer {
    fn normalize(
        &self,
        labels: &LabelTypes,
        permissions: &dyn PermissionSource,
        approvals: Vec<Approval>,
    ) -> NormalizedApprovals {
        let mut result = NormalizedApprovals::default();
        for approval in approvals {
            if approval.is_submit() {
                result.unchanged.push(approval);
                continue;
            }
            let Some(label) = labels.by_label(approval.label().as_str()) else {
                tracing::debug!(label = %approval.label(), "dropping vote on unknown label");
                result.deleted.push(approval);
                continue;
            };
            let Some(range) = permissions.permitted_range(&label.name, approval.account()) else {
                result.deleted.push(approval);
                continue;
            };
            let value = range.clamp(label.clamp(approval.value));
            if value == approval.value {
                result.unchanged.push(approval);
            } else {
                let mut copy = approval;
                copy.value = value;
                result.updated.push(copy);
            }
        }
        result
    }
}
