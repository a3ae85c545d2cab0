pub mod account;
pub mod approval;
pub mod change;
pub mod commit;
pub mod label;
pub mod message;
pub mod patch_set;
pub mod refs;

pub use account::*;
pub use approval::*;
pub use change::*;
pub use commit::*;
pub use label::*;
pub use message::*;
pub use patch_set::*;
pub use refs::*;
