use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Absolute 0-based frame index in output timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> StoryreelResult<Self> {
        if start.0 > end.0 {
            return Err(StoryreelError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Iterate the frame indices of the range in increasing order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> StoryreelResult<Self> {
        if den == 0 {
            return Err(StoryreelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StoryreelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate, e.g. `Fps::integer(24)`.
    pub fn integer(fps: u32) -> StoryreelResult<Self> {
        Self::new(fps, 1)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to a frame count, rounding to the nearest frame.
    ///
    /// Integral seconds at an integral rate map exactly to `secs * fps`.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * f64::from(self.num) / f64::from(self.den)).round() as u64
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl std::str::FromStr for Fps {
    type Err = StoryreelError;

    /// Parse `"24"` or `"30000/1001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| StoryreelError::validation(format!("invalid fps \"{s}\"")))
        };
        match s.split_once('/') {
            Some((num, den)) => Self::new(parse(num)?, parse(den)?),
            None => Self::new(parse(s)?, 1),
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Vertical 9:16 canvas used for short-form video.
    pub const VERTICAL_720P: Canvas = Canvas {
        width: 720,
        height: 1280,
    };

    /// Number of bytes in one tightly packed RGB8 frame of this size.
    pub fn rgb8_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 3
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::VERTICAL_720P
    }
}

/// Opaque RGB8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Black, the default letterbox fill.
    pub const BLACK: Rgb8 = Rgb8 { r: 0, g: 0, b: 0 };

    /// Construct from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array.
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
