//! Core value types and the crate error.

/// Hex and serde support for `Rgb8`.
mod color;
/// Frames, frame rates, canvas and colors.
pub mod core;
/// Error type and result alias.
pub mod error;
pub(crate) mod math;
