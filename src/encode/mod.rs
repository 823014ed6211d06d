//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order. A finished file can then go through a
//! [`post::PostProcess`] stage.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Output path locking and partial-file handling.
pub mod output;
/// Best-effort post-processing of finished files.
pub mod post;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
