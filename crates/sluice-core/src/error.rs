use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid object ID: {0}")]
    InvalidObjectId(String),
    #[error("invalid change ID: {0}")]
    InvalidChangeId(String),
    #[error("invalid revision ID: {0}")]
    InvalidRevisionId(String),
    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
