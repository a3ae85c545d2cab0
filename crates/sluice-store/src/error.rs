use std::path::PathBuf;
use thiserror::Error;

use sluice_core::id::{ChangeId, ObjectId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not a sluice repository: {0}")]
    NotARepository(PathBuf),
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("ref not found: {0}")]
    RefNotFound(String),
    #[error("change not found: {0}")]
    ChangeNotFound(ChangeId),
    #[error("lock contention on {0}")]
    LockContention(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("core error: {0}")]
    Core(#[from] sluice_core::CoreError),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid project configuration in {commit}: {reason}")]
    InvalidProjectConfig { commit: ObjectId, reason: String },
    #[error("metadata store error: {0}")]
    Meta(String),
    #[error("ref CAS conflict on {ref_name}: expected {expected}, actual {actual}")]
    RefCasConflict {
        ref_name: String,
        expected: String,
        actual: String,
    },
}
