use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;
use crate::CoreError;

/// Ref holding the project's own configuration.
pub const REFS_CONFIG: &str = "refs/meta/config";
pub const REFS_HEADS: &str = "refs/heads/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchName {
    pub project: String,
    pub ref_name: String,
}

impl BranchName {
    /// Short names like `main` are expanded under `refs/heads/`.
    pub fn new(project: impl Into<String>, ref_name: &str) -> Result<Self, CoreError> {
        let ref_name = if ref_name.starts_with("refs/") {
            ref_name.to_string()
        } else {
            format!("{REFS_HEADS}{ref_name}")
        };
        validate_ref_name(&ref_name)?;
        Ok(Self {
            project: project.into(),
            ref_name,
        })
    }

    pub fn is_config(&self) -> bool {
        self.ref_name == REFS_CONFIG
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.ref_name)
    }
}

pub fn validate_ref_name(name: &str) -> Result<(), CoreError> {
    let bad = !name.starts_with("refs/")
        || name.ends_with('/')
        || name.ends_with(".lock")
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        || name.chars().any(|c| c.is_whitespace() || c.is_control());
    if bad {
        return Err(CoreError::InvalidRefName(name.to_string()));
    }
    Ok(())
}

/// Compare-and-swap instruction for one ref. `old_id` is zero when the ref
/// is being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdateCommand {
    pub ref_name: String,
    pub old_id: ObjectId,
    pub new_id: ObjectId,
}

impl RefUpdateCommand {
    pub fn new(ref_name: impl Into<String>, old_id: ObjectId, new_id: ObjectId) -> Self {
        Self {
            ref_name: ref_name.into(),
            old_id,
            new_id,
        }
    }

    pub fn is_create(&self) -> bool {
        self.old_id.is_zero()
    }
}

impl fmt::Display for RefUpdateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.ref_name,
            self.old_id.short(),
            self.new_id.short()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_branch_names_expand_to_heads() {
        let b = BranchName::new("demo", "main").unwrap();
        assert_eq!(b.ref_name, "refs/heads/main");
        assert!(!b.is_config());
    }

    #[test]
    fn config_ref_is_recognised() {
        let b = BranchName::new("demo", REFS_CONFIG).unwrap();
        assert!(b.is_config());
    }

    #[test]
    fn rejects_traversal_and_lock_names() {
        assert!(validate_ref_name("refs/heads/../x").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("refs/heads/a b").is_err());
        assert!(validate_ref_name("heads/main").is_err());
    }
}
