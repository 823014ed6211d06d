use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::compose::FrameRgb;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Number of frames that will be pushed.
    pub total_frames: u64,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called exactly once per frame index, in strictly
/// increasing order starting at 0.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StoryreelResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> StoryreelResult<()>;
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRgb)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRgb)] {
        &self.frames
    }

    /// Return `true` once `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StoryreelResult<()> {
        let expected = self.frames.len() as u64;
        if idx.0 != expected {
            return Err(StoryreelError::encode(format!(
                "in-memory sink expected frame {expected}, got {}",
                idx.0
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> StoryreelResult<()> {
        self.ended = true;
        Ok(())
    }
}
