//! Live adapters for real external interactions.

pub mod bugzilla;
pub mod clock;
pub mod filesystem;
pub mod jira;

pub use bugzilla::LiveBugzilla;
pub use clock::LiveClock;
pub use filesystem::LiveFileSystem;
pub use jira::LiveJira;
