pub mod error;
pub mod hash;
pub mod id;
pub mod types;

pub use error::CoreError;
pub use hash::content_hash;
pub use id::{AccountId, ChangeId, MessageId, ObjectId, RevisionId, SubmissionId};
