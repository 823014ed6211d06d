//! Storyboard to frame-schedule conversion.

/// Gap detection, duration rounding and total-duration enforcement.
pub mod schedule;
