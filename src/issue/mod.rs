//! Issue references, tracker records, and the collected-issue index.

pub mod index;
pub mod record;
pub mod reference;

pub use index::{IssueEntry, IssueIndex, UsageRecord};
pub use record::{Flag, IssueRecord};
pub use reference::{IssueRef, TrackerKind};
