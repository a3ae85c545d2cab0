use thiserror::Error;

use sluice_core::id::ChangeId;
use sluice_core::types::{BranchName, ChangeStatus, Classification};
use sluice_store::StoreError;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The batch cannot be integrated as proposed. Terminal for this attempt.
    #[error("{message}")]
    Integration {
        message: String,
        #[source]
        source: Option<StoreError>,
    },
    #[error("status not set for change {0}; expected to previously fail fast")]
    MissingStatus(ChangeId),
    #[error("unexpected status {status:?} for change {change}; expected to previously fail fast")]
    UnexpectedStatus {
        change: ChangeId,
        status: Classification,
    },
    #[error("change not found: {0}")]
    ChangeNotFound(ChangeId),
    #[error("change {change} targets {actual}, not {expected}")]
    WrongBranch {
        change: ChangeId,
        expected: BranchName,
        actual: BranchName,
    },
    #[error("change {change} is {}", .status.as_str())]
    ChangeClosed { change: ChangeId, status: ChangeStatus },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("core error: {0}")]
    Core(#[from] sluice_core::CoreError),
}

impl SubmitError {
    pub fn integration(message: impl Into<String>) -> Self {
        Self::Integration {
            message: message.into(),
            source: None,
        }
    }

    /// Programming errors in the caller; never worth another attempt.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingStatus(_) | Self::UnexpectedStatus { .. })
    }

    /// Only a lost ref race or lock contention can succeed when re-run from
    /// a fresh resolution.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::RefCasConflict { .. } | StoreError::LockContention(_))
        )
    }
}

/// Failure of a post-commit side effect. Only ever logged.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification failed: {0}")]
    Notify(String),
    #[error("hook {hook} exited with {status}")]
    HookFailed { hook: String, status: String },
    #[error("hook {hook} did not finish within {timeout_ms}ms")]
    HookTimeout { hook: String, timeout_ms: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::id::ObjectId;

    #[test]
    fn contract_violations_are_not_retryable() {
        let err = SubmitError::MissingStatus(ChangeId::new());
        assert!(err.is_contract_violation());
        assert!(!err.is_retryable());

        let err = SubmitError::Store(StoreError::RefCasConflict {
            ref_name: "refs/heads/main".into(),
            expected: ObjectId::zero().to_hex(),
            actual: "x".into(),
        });
        assert!(err.is_retryable());
        assert!(!SubmitError::integration("nope").is_retryable());
    }
}
