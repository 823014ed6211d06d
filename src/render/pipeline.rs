use crate::assets::resolve::AssetResolution;
use crate::config::RenderConfig;
use crate::encode::ffmpeg::FfmpegSink;
use crate::encode::output::OutputLock;
use crate::encode::post::{PostProcess, apply_best_effort};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::compose::{ComposeOutcome, Compositor, FrameRgb};
use crate::storyboard::model::Storyboard;
use crate::timeline::schedule::{Schedule, build_schedule};
use std::path::{Path, PathBuf};

/// Progress notifications emitted during a render.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
    /// The schedule is ready; encoding is about to start.
    ScheduleBuilt {
        /// Frames in the output.
        total_frames: u64,
        /// Number of slots.
        slots: usize,
        /// Frames that show the fill color.
        gap_fill_frames: u64,
    },
    /// A slot's frame was composed and is about to be held for its range.
    SlotStarted {
        /// Slot index within the schedule.
        slot: usize,
        /// Frames the slot covers.
        range: FrameRange,
        /// How the frame was produced.
        outcome: ComposeOutcome,
    },
    /// Frames pushed to the sink so far.
    FramesWritten {
        /// Frames written.
        written: u64,
        /// Frames expected in total.
        total: u64,
    },
    /// The sink finished.
    Finalized {
        /// Frames written.
        frames: u64,
    },
    /// The post-processing stage ran.
    PostProcessed {
        /// Stage name.
        stage: String,
        /// Whether the output was replaced.
        applied: bool,
    },
}

/// Receives [`RenderEvent`]s. Implemented for any `FnMut(&RenderEvent)`.
pub trait ProgressObserver {
    /// Handle one event.
    fn on_event(&mut self, event: &RenderEvent);
}

impl<F: FnMut(&RenderEvent)> ProgressObserver for F {
    fn on_event(&mut self, event: &RenderEvent) {
        self(event)
    }
}

/// Observer that ignores all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_event(&mut self, _event: &RenderEvent) {}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Counters from pushing a schedule through a sink.
pub struct RenderStats {
    /// Frames pushed to the sink.
    pub frames_written: u64,
    /// Frames that were composed (once per run of identical slots).
    pub frames_composed: u64,
    /// Assets that failed to decode and were replaced by gap-fill.
    pub decode_failures: Vec<PathBuf>,
}

/// Summary of one render.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderReport {
    /// Output file, when rendering to disk.
    pub out_path: Option<PathBuf>,
    /// Frames in the output.
    pub total_frames: u64,
    /// Output frame rate.
    pub fps: Fps,
    /// Output duration in seconds.
    pub duration_secs: f64,
    /// Number of schedule slots.
    pub slots: usize,
    /// Frames that show the fill color, including decode failures.
    pub gap_fill_frames: u64,
    /// Media references with no asset.
    pub unresolved: Vec<String>,
    /// Assets that failed to decode.
    pub decode_failures: Vec<PathBuf>,
    /// Whether the compatibility pass replaced the output.
    pub compat_applied: bool,
}

/// Push every frame of `schedule` into `sink`.
///
/// Each slot is composed once and its frame is repeated across the slot's range. Consecutive
/// slots bound to the same asset reuse the composed frame. The sink receives exactly
/// `schedule.total_frames` frames, in order, between `begin` and `end`.
pub fn render_schedule(
    schedule: &Schedule,
    compositor: &Compositor,
    sink: &mut dyn FrameSink,
    progress: &mut dyn ProgressObserver,
) -> StoryreelResult<RenderStats> {
    schedule.validate()?;
    let canvas = compositor.canvas();
    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: schedule.fps,
        total_frames: schedule.total_frames,
    })?;

    let mut stats = RenderStats::default();
    let mut held: Option<(Option<&Path>, FrameRgb, ComposeOutcome)> = None;

    for (i, slot) in schedule.slots.iter().enumerate() {
        let asset = slot.asset_path();
        let (frame, outcome) = match held.take() {
            Some((prev, frame, outcome)) if prev == asset => (frame, outcome),
            _ => {
                let (frame, outcome) = compositor.compose(asset);
                stats.frames_composed += 1;
                if outcome == ComposeOutcome::DecodeFailed
                    && let Some(p) = asset
                    && !stats.decode_failures.iter().any(|f| f == p)
                {
                    stats.decode_failures.push(p.to_path_buf());
                }
                (frame, outcome)
            }
        };

        progress.on_event(&RenderEvent::SlotStarted {
            slot: i,
            range: slot.range,
            outcome,
        });
        for f in slot.range.iter() {
            sink.push_frame(f, &frame)?;
            stats.frames_written += 1;
        }
        progress.on_event(&RenderEvent::FramesWritten {
            written: stats.frames_written,
            total: schedule.total_frames,
        });

        held = Some((asset, frame, outcome));
    }

    if stats.frames_written != schedule.total_frames {
        return Err(StoryreelError::schedule(format!(
            "wrote {} frames, schedule requires {}",
            stats.frames_written, schedule.total_frames
        )));
    }

    sink.end()?;
    progress.on_event(&RenderEvent::Finalized {
        frames: stats.frames_written,
    });
    Ok(stats)
}

/// Schedule and render a storyboard into any sink.
#[tracing::instrument(skip_all, fields(entries = storyboard.entries.len()))]
pub fn render_storyboard(
    storyboard: &Storyboard,
    resolution: &AssetResolution,
    config: &RenderConfig,
    sink: &mut dyn FrameSink,
    progress: &mut dyn ProgressObserver,
) -> StoryreelResult<RenderReport> {
    config.validate()?;
    let schedule = build_schedule(storyboard, resolution, &config.schedule_opts())?;
    let gap_fill_frames = schedule.gap_fill_frames();
    progress.on_event(&RenderEvent::ScheduleBuilt {
        total_frames: schedule.total_frames,
        slots: schedule.slots.len(),
        gap_fill_frames,
    });

    let compositor = config.compositor()?;
    let stats = render_schedule(&schedule, &compositor, sink, progress)?;

    let failed_frames: u64 = schedule
        .slots
        .iter()
        .filter(|s| {
            s.asset_path()
                .is_some_and(|p| stats.decode_failures.iter().any(|f| f == p))
        })
        .map(|s| s.len_frames())
        .sum();

    tracing::info!(
        frames = stats.frames_written,
        composed = stats.frames_composed,
        unresolved = schedule.diagnostics.unresolved.len(),
        decode_failures = stats.decode_failures.len(),
        "render finished"
    );

    Ok(RenderReport {
        out_path: None,
        total_frames: schedule.total_frames,
        fps: schedule.fps,
        duration_secs: schedule.duration_secs(),
        slots: schedule.slots.len(),
        gap_fill_frames: gap_fill_frames + failed_frames,
        unresolved: schedule.diagnostics.unresolved,
        decode_failures: stats.decode_failures,
        compat_applied: false,
    })
}

/// Render a storyboard to an MP4 file, followed by the config's compatibility pass.
///
/// `ffmpeg` must be installed and on `PATH`. On error no file is left at `out_path` (an existing
/// file is only replaced by a complete render).
pub fn render_to_mp4(
    storyboard: &Storyboard,
    resolution: &AssetResolution,
    config: &RenderConfig,
    out_path: &Path,
    progress: &mut dyn ProgressObserver,
) -> StoryreelResult<RenderReport> {
    let compat = config.compat_pass();
    render_to_mp4_with_post(
        storyboard,
        resolution,
        config,
        out_path,
        compat.as_ref().map(|c| c as &dyn PostProcess),
        progress,
    )
}

/// Render a storyboard to an MP4 file, then run `post` on it.
///
/// The output path is locked for the whole call. A failing `post` is logged and the first-pass
/// file is kept.
#[tracing::instrument(skip_all, fields(out = %out_path.display()))]
pub fn render_to_mp4_with_post(
    storyboard: &Storyboard,
    resolution: &AssetResolution,
    config: &RenderConfig,
    out_path: &Path,
    post: Option<&dyn PostProcess>,
    progress: &mut dyn ProgressObserver,
) -> StoryreelResult<RenderReport> {
    config.validate()?;
    let _lock = OutputLock::acquire(out_path)?;

    let mut sink = FfmpegSink::new(config.sink_opts(out_path));
    let mut report = render_storyboard(storyboard, resolution, config, &mut sink, progress)?;
    report.out_path = Some(out_path.to_path_buf());

    if let Some(post) = post {
        let applied = apply_best_effort(post, out_path);
        progress.on_event(&RenderEvent::PostProcessed {
            stage: post.name().to_owned(),
            applied,
        });
        report.compat_applied = applied;
    }
    Ok(report)
}

/// Compose the single frame shown at `frame`.
pub fn render_frame(
    schedule: &Schedule,
    frame: FrameIndex,
    config: &RenderConfig,
) -> StoryreelResult<FrameRgb> {
    let slot = schedule.slot_at(frame).ok_or_else(|| {
        StoryreelError::validation(format!(
            "frame {} is outside the video ({} frames)",
            frame.0, schedule.total_frames
        ))
    })?;
    let compositor = config.compositor()?;
    Ok(compositor.compose(slot.asset_path()).0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
