use crate::assets::resolve::{AssetResolution, Resolved};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::storyboard::model::{Storyboard, StoryboardEntry};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Seconds given to each entry when nothing in the storyboard carries timing.
pub const DEFAULT_CLIP_SECS: f64 = 3.0;

/// What a schedule slot was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    /// Storyboard entry at this index.
    Entry(usize),
    /// Uncovered time between (or after) entries.
    Gap,
}

/// Contiguous frame range bound to one asset, or to gap-fill when `asset` is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleSlot {
    /// Frames covered by the slot.
    pub range: FrameRange,
    /// Where the slot came from.
    pub source: SlotSource,
    /// Media reference of the originating entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    /// Resolved local asset; `None` renders as gap-fill.
    pub asset: Option<PathBuf>,
}

impl ScheduleSlot {
    /// Number of frames held by this slot.
    pub fn len_frames(&self) -> u64 {
        self.range.len_frames()
    }

    /// Return `true` when this slot renders as solid fill.
    pub fn is_gap_fill(&self) -> bool {
        self.asset.is_none()
    }

    /// Resolved asset path, if any.
    pub fn asset_path(&self) -> Option<&Path> {
        self.asset.as_deref()
    }
}

/// Recoverable oddities met while building a schedule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleDiagnostics {
    /// References with no local asset (rendered as gap-fill).
    pub unresolved: Vec<String>,
    /// Entries whose length rounded to zero frames and was clamped to one.
    pub clamped: Vec<usize>,
    /// Entries that overlapped earlier ones and were moved forward.
    pub shifted: Vec<usize>,
    /// Entries cut short or dropped by the total duration.
    pub truncated: Vec<usize>,
}

/// Frame-accurate timeline: slots partitioning `[0, total_frames)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schedule {
    /// Output frame rate.
    pub fps: Fps,
    /// Total frames in the output.
    pub total_frames: u64,
    /// Slots in increasing frame order.
    pub slots: Vec<ScheduleSlot>,
    /// Recovered problems.
    pub diagnostics: ScheduleDiagnostics,
}

/// Timeline construction options.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleOpts {
    /// Output frame rate.
    pub fps: Fps,
    /// Target duration override in seconds; wins over the storyboard's own duration.
    pub duration_secs: Option<f64>,
    /// Per-entry duration used to infer a total when no entry is timed.
    pub default_clip_secs: f64,
}

impl ScheduleOpts {
    /// Options with the given frame rate and the default clip length.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            duration_secs: None,
            default_clip_secs: DEFAULT_CLIP_SECS,
        }
    }

    fn validate(&self) -> StoryreelResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if let Some(d) = self.duration_secs
            && (!d.is_finite() || d < 0.0)
        {
            return Err(StoryreelError::validation(
                "target duration must be a finite, non-negative number of seconds",
            ));
        }
        if !self.default_clip_secs.is_finite() || self.default_clip_secs <= 0.0 {
            return Err(StoryreelError::validation(
                "default clip duration must be a positive number of seconds",
            ));
        }
        Ok(())
    }
}

impl Schedule {
    /// Check that slots are non-empty and partition `[0, total_frames)` exactly.
    pub fn validate(&self) -> StoryreelResult<()> {
        let mut cursor = 0u64;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.range.start.0 != cursor {
                return Err(StoryreelError::schedule(format!(
                    "slot {i} starts at frame {} but coverage ends at {cursor}",
                    slot.range.start.0
                )));
            }
            if slot.range.is_empty() {
                return Err(StoryreelError::schedule(format!("slot {i} is empty")));
            }
            cursor = slot.range.end.0;
        }
        if cursor != self.total_frames {
            return Err(StoryreelError::schedule(format!(
                "slots cover {cursor} frames, expected {}",
                self.total_frames
            )));
        }
        Ok(())
    }

    /// Slot covering frame `f`.
    pub fn slot_at(&self, f: FrameIndex) -> Option<&ScheduleSlot> {
        let i = self.slots.partition_point(|s| s.range.end.0 <= f.0);
        self.slots.get(i).filter(|s| s.range.contains(f))
    }

    /// Output duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Frames that render as solid fill because no asset is bound.
    pub fn gap_fill_frames(&self) -> u64 {
        self.slots
            .iter()
            .filter(|s| s.is_gap_fill())
            .map(ScheduleSlot::len_frames)
            .sum()
    }
}

/// Build the frame schedule for a storyboard.
///
/// Entries are placed in storyboard order. Uncovered time becomes gap-fill, zero-length entries
/// are clamped to one frame, overlapping entries are moved to the end of the previous one, and
/// everything is cut at the target duration. The result always holds at least one frame.
#[tracing::instrument(skip_all, fields(entries = storyboard.entries.len(), fps = %opts.fps))]
pub fn build_schedule(
    storyboard: &Storyboard,
    resolution: &AssetResolution,
    opts: &ScheduleOpts,
) -> StoryreelResult<Schedule> {
    opts.validate()?;
    storyboard.validate()?;

    let fps = opts.fps;
    let target_secs = opts
        .duration_secs
        .unwrap_or_else(|| storyboard.target_duration_secs(opts.default_clip_secs));
    let total_frames = fps.secs_to_frames_round(target_secs).max(1);

    let n = storyboard.entries.len() as u64;
    let share = if n == 0 { 0 } else { (total_frames / n).max(1) };

    let mut b = SlotBuilder::new(total_frames);
    for (i, entry) in storyboard.entries.iter().enumerate() {
        let is_last = i as u64 + 1 == n;
        let (start, len) = entry_frames(entry, fps, b.cursor, share, total_frames, is_last);

        let len = if len == 0 {
            tracing::warn!(entry = i, media_ref = %entry.media_ref, "entry has no duration, clamped to one frame");
            b.diagnostics.clamped.push(i);
            1
        } else {
            len
        };

        let start = if start < b.cursor {
            tracing::debug!(entry = i, from = start, to = b.cursor, "entry overlaps, shifted forward");
            b.diagnostics.shifted.push(i);
            b.cursor
        } else {
            start
        };

        let asset = match resolution.resolve(&entry.media_ref) {
            Resolved::Found(p) => Some(p),
            Resolved::Missing => {
                tracing::warn!(entry = i, media_ref = %entry.media_ref, "media reference unresolved, using gap-fill");
                b.diagnostics.unresolved.push(entry.media_ref.clone());
                None
            }
        };

        b.place(i, start, start.saturating_add(len), &entry.media_ref, asset);
    }
    b.fill_to_end();

    let schedule = Schedule {
        fps,
        total_frames,
        slots: b.slots,
        diagnostics: b.diagnostics,
    };
    schedule.validate()?;
    tracing::debug!(
        total_frames,
        slots = schedule.slots.len(),
        gap_fill_frames = schedule.gap_fill_frames(),
        "schedule built"
    );
    Ok(schedule)
}

/// Start frame and frame length for one entry, synthesizing missing timing.
///
/// A missing start means "right after the previous entry"; a missing end means one even share
/// of the total, except for the last entry, which runs to the end so the shares sum exactly.
fn entry_frames(
    entry: &StoryboardEntry,
    fps: Fps,
    cursor: u64,
    share: u64,
    total_frames: u64,
    is_last: bool,
) -> (u64, u64) {
    let start = entry
        .start
        .map(|t| fps.secs_to_frames_round(t.as_secs()))
        .unwrap_or(cursor);

    // Both endpoints are rounded on the same grid, so an entry ending where the next one starts
    // meets it exactly.
    let len = match entry.end {
        Some(e) => fps.secs_to_frames_round(e.as_secs()).saturating_sub(start),
        None if is_last => total_frames.saturating_sub(start),
        None => share,
    };
    (start, len)
}

struct SlotBuilder {
    total: u64,
    cursor: u64,
    slots: Vec<ScheduleSlot>,
    diagnostics: ScheduleDiagnostics,
}

impl SlotBuilder {
    fn new(total: u64) -> Self {
        Self {
            total,
            cursor: 0,
            slots: Vec::new(),
            diagnostics: ScheduleDiagnostics::default(),
        }
    }

    fn place(
        &mut self,
        entry: usize,
        start: u64,
        end: u64,
        media_ref: &str,
        asset: Option<PathBuf>,
    ) {
        if start >= self.total {
            tracing::warn!(entry, start, total = self.total, "entry starts after the end, dropped");
            self.diagnostics.truncated.push(entry);
            return;
        }
        if end > self.total {
            self.diagnostics.truncated.push(entry);
        }

        self.gap_until(start);
        let end = end.min(self.total);
        self.slots.push(ScheduleSlot {
            range: FrameRange {
                start: FrameIndex(start),
                end: FrameIndex(end),
            },
            source: SlotSource::Entry(entry),
            media_ref: Some(media_ref.to_owned()),
            asset,
        });
        self.cursor = end;
    }

    fn gap_until(&mut self, end: u64) {
        if end <= self.cursor {
            return;
        }
        self.slots.push(ScheduleSlot {
            range: FrameRange {
                start: FrameIndex(self.cursor),
                end: FrameIndex(end),
            },
            source: SlotSource::Gap,
            media_ref: None,
            asset: None,
        });
        self.cursor = end;
    }

    fn fill_to_end(&mut self) {
        let total = self.total;
        self.gap_until(total);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/schedule.rs"]
mod tests;
