//! Snapshot comparison
//!
//! - `channel`: node inclusion/exclusion deltas of a single channel
//! - `extension`: per-extension channel diffs and whole-snapshot comparison

pub mod channel;
pub mod extension;

pub use channel::ChannelDiff;
pub use extension::{compare, ExtensionDiff};
