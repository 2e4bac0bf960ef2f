//! Domain models for time-indexed outlines.
//!
//! This module contains the in-memory types: time points, blocks, the routed
//! collection of blocks, and configuration.

/// Outline block type and its annotation rules.
pub mod block;
pub use block::{OutlineBlock, sanitize};

mod config;
pub use config::{CONFIG_DIR, CONFIG_FILE, Config};

/// The block collection and time-based routing.
pub mod outline;
pub use outline::{Definition, Outline};

/// Time values on the outline's axis.
pub mod time_point;
pub use time_point::{InvalidTimeValue, TimePoint};

mod topic;
pub use topic::{InvalidTopic, Topic};
pub(crate) use topic::{END_MARKER, HEADER_PREFIX};
