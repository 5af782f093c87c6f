//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the gate's core and an
//! external system (time, filesystem, issue trackers).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod tracker;

pub use clock::{Clock, SleepFuture};
pub use filesystem::FileSystem;
pub use tracker::{FetchFuture, TrackerClient};
