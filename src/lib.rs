//! Storyreel turns a timed storyboard of still images into a fixed-rate vertical video.
//!
//! The pipeline has four stages:
//!
//! - resolve each entry's media reference to a local file ([`AssetResolution`])
//! - derive a gap-free frame [`Schedule`] from the storyboard timing ([`build_schedule`])
//! - letterbox each asset onto the output canvas ([`Compositor`])
//! - stream the frames into a [`FrameSink`], normally [`FfmpegSink`] for MP4 output
//!
//! [`render_to_mp4`] runs all of them for one storyboard.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Media lookup and image decoding.
pub mod assets;
/// Render configuration.
pub mod config;
/// Encoding sinks and post-processing.
pub mod encode;
mod foundation;
/// Frame composition and render session.
pub mod render;
/// Storyboard model and ingestion.
pub mod storyboard;
/// Frame scheduling.
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgb8};
pub use crate::foundation::error::{StoryreelError, StoryreelResult};

pub use crate::assets::resolve::{AssetResolution, Resolved};
pub use crate::config::{CompatConfig, EncoderConfig, RenderConfig};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::output::OutputLock;
pub use crate::encode::post::{FfmpegCompat, PostProcess};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::render::compose::{ComposeOutcome, Compositor, FrameRgb};
pub use crate::render::pipeline::{
    NoProgress, ProgressObserver, RenderEvent, RenderReport, RenderStats, render_frame,
    render_schedule, render_storyboard, render_to_mp4, render_to_mp4_with_post,
};
pub use crate::storyboard::model::{Storyboard, StoryboardEntry, Timecode};
pub use crate::timeline::schedule::{
    DEFAULT_CLIP_SECS, Schedule, ScheduleDiagnostics, ScheduleOpts, ScheduleSlot, SlotSource,
    build_schedule,
};
