pub mod normalizer;
pub mod permissions;

pub use normalizer::{LabelNormalizer, NormalizedApprovals, RangeNormalizer};
pub use permissions::PermissionSource;
