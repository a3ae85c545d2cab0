pub mod ancestor;
pub mod approvals;
pub mod batch;
pub mod collab;
pub mod commits;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod op;
pub mod ref_plan;
pub mod strategy;
pub mod tip;

#[cfg(test)]
mod testutil;

pub use batch::{BatchOutcome, SubmitBatch};
pub use collab::{AccountCache, MergedEvent, MergedHook, MergedNotifier, RepoBackend, StaticAccounts};
pub use context::SubmitArgs;
pub use error::{DispatchError, SubmitError};
pub use op::SubmitOp;
pub use strategy::{StrategyEffects, SubmitType};
pub use tip::MergeTip;
