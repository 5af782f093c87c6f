//! Collector: turns collected test items into the collected-issue index.
//!
//! Extraction is split in two stages that can be tested on their own:
//! [`docstring`] parses structured metadata fields and [`source`] finds
//! `is_open` guards in code. [`collector`] combines them with explicit
//! markers.

pub mod collector;
pub mod docstring;
pub mod manifest;
pub mod source;

pub use collector::{CollectedItem, Collection, Collector, ISSUE_MARKERS};
pub use manifest::{CollectionManifest, Location, Marker, TestItem, TestModule};
