//! Adapter implementations of the port traits.

pub mod canned;
pub mod live;
