//! Plain-text, time-indexed outlines
//!
//! An outline divides the running time of a video into named blocks, each
//! holding timestamped annotations. Outlines are stored in a line-oriented
//! text file which round-trips exactly and stays pleasant to edit by hand.

pub mod domain;
pub use domain::{Config, Definition, InvalidTimeValue, Outline, OutlineBlock, TimePoint, Topic};

/// Typed operations for tool-calling agents.
pub mod operation;
pub use operation::Operation;

/// Filesystem storage and the outline text format.
pub mod storage;
pub use storage::{EditError, ErrorKind, OutlineDocument};
