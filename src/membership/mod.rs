pub mod adapter;
pub mod event;
pub mod ledger;

pub use adapter::TrackedChats;
pub use event::{ChatRef, EventKind, MembershipEvent, Role};
pub use ledger::{apply_event, run_ledger, PointsChange};
