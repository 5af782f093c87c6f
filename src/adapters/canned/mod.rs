//! Canned adapters serving fixed data from memory.
//!
//! Used by tests and dry runs: nothing here touches the network, the disk,
//! or the real clock.

pub mod clock;
pub mod filesystem;
pub mod tracker;

pub use clock::FixedClock;
pub use filesystem::MemoryFileSystem;
pub use tracker::CannedTracker;
