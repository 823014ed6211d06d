//! Frame composition and the render session.

/// Letterboxing compositor producing canonical RGB frames.
pub mod compose;
/// Schedule-driven rendering into frame sinks, progress and reports.
pub mod pipeline;
