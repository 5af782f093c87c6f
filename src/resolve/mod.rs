//! Resolver: fills tracker data into the collected-issue index and decides
//! whether each issue is open or obsolete.

pub mod context;
pub mod duplicates;
pub mod retry;
pub mod rules;

pub use context::IssueContext;
pub use duplicates::{follow_duplicates, MAX_DUPLICATE_DEPTH};
pub use retry::{fetch_with_retry, RetryPolicy};
