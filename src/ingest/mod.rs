//! Landmark frame ingestion.
//!
//! This module provides sources of tracker frames:
//! - JSON-lines files and stdin (frames exported by the pose/hand tracker)
//! - Stub source (`stub://`, synthetic hand cycles for demos and tests)
//!
//! Landmark extraction itself happens upstream in the tracker. Sources only
//! parse what the tracker emits; shape problems are left to the adapter.
//! Sources MUST NOT log landmark contents.

pub mod file;
pub mod synthetic;

pub use file::{FrameSource, SourceConfig, SourceStats};
pub use synthetic::{SyntheticConfig, SyntheticLandmarks};
