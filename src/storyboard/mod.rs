//! Structured storyboard input.
//!
//! A storyboard is parsed and validated once, at ingestion, and is immutable afterwards.

/// JSON ingestion.
pub mod load;
/// Storyboard, entry and timecode types.
pub mod model;
