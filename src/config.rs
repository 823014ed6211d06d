//! Render configuration.
//!
//! All fields have defaults, so `{}` is a valid config file. CLI flags override individual fields
//! after loading.

use crate::encode::ffmpeg::FfmpegSinkOpts;
use crate::encode::post::FfmpegCompat;
use crate::foundation::core::{Canvas, Fps, Rgb8};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::compose::Compositor;
use crate::timeline::schedule::{DEFAULT_CLIP_SECS, ScheduleOpts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Output canvas (both sides even and non-zero for MP4 output).
    pub canvas: Canvas,
    /// Output frame rate.
    #[serde(deserialize_with = "deserialize_fps", serialize_with = "serialize_fps")]
    pub fps: Fps,
    /// Letterbox and gap-fill color.
    pub fill: Rgb8,
    /// Explicit total duration, overriding the storyboard.
    pub duration_secs: Option<f64>,
    /// Length of an untimed clip when nothing else fixes the total duration.
    pub default_clip_secs: f64,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// First-pass encoder settings.
    pub encoder: EncoderConfig,
    /// Compatibility pass settings.
    pub compat: CompatConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::VERTICAL_720P,
            fps: Fps { num: 24, den: 1 },
            fill: Rgb8::BLACK,
            duration_secs: None,
            default_clip_secs: DEFAULT_CLIP_SECS,
            overwrite: true,
            encoder: EncoderConfig::default(),
            compat: CompatConfig::default(),
        }
    }
}

/// First-pass `ffmpeg` encoder settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// `ffmpeg` video encoder name.
    pub video_codec: String,
    /// Output pixel format.
    pub pix_fmt: String,
    /// Extra encoder arguments.
    pub extra_args: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let opts = FfmpegSinkOpts::new(PathBuf::new());
        Self {
            video_codec: opts.video_codec,
            pix_fmt: opts.pix_fmt,
            extra_args: opts.extra_args,
        }
    }
}

/// Compatibility pass settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompatConfig {
    /// Run the pass at all.
    pub enabled: bool,
    /// Target encoder.
    pub video_codec: String,
    /// Target pixel format.
    pub pix_fmt: String,
    /// Move the MP4 index to the front.
    pub faststart: bool,
}

impl Default for CompatConfig {
    fn default() -> Self {
        let c = FfmpegCompat::default();
        Self {
            enabled: true,
            video_codec: c.video_codec,
            pix_fmt: c.pix_fmt,
            faststart: c.faststart,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a config from JSON.
    pub fn from_reader(reader: impl std::io::Read) -> StoryreelResult<Self> {
        let cfg: Self = serde_json::from_reader(reader)
            .map_err(|e| StoryreelError::serde(format!("render config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a config file.
    pub fn from_path(path: &Path) -> StoryreelResult<Self> {
        let f = std::fs::File::open(path).map_err(|e| {
            StoryreelError::validation(format!("open render config '{}': {e}", path.display()))
        })?;
        Self::from_reader(std::io::BufReader::new(f))
    }

    /// Check invariants the encoder and scheduler rely on.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(StoryreelError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(format!(
                "canvas {}x{} must have even dimensions",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(StoryreelError::validation("fps must be non-zero"));
        }
        if let Some(d) = self.duration_secs
            && !(d.is_finite() && d >= 0.0)
        {
            return Err(StoryreelError::validation(format!(
                "duration must be a non-negative number of seconds, got {d}"
            )));
        }
        if !(self.default_clip_secs.is_finite() && self.default_clip_secs > 0.0) {
            return Err(StoryreelError::validation(
                "default_clip_secs must be a positive number of seconds",
            ));
        }
        if self.encoder.video_codec.is_empty() {
            return Err(StoryreelError::validation("encoder video_codec is empty"));
        }
        Ok(())
    }

    /// Scheduler inputs derived from this config.
    pub fn schedule_opts(&self) -> ScheduleOpts {
        ScheduleOpts {
            fps: self.fps,
            duration_secs: self.duration_secs,
            default_clip_secs: self.default_clip_secs,
        }
    }

    /// Compositor for this config's canvas and fill.
    pub fn compositor(&self) -> StoryreelResult<Compositor> {
        Compositor::new(self.canvas, self.fill)
    }

    /// `ffmpeg` sink options targeting `out_path`.
    pub fn sink_opts(&self, out_path: impl Into<PathBuf>) -> FfmpegSinkOpts {
        FfmpegSinkOpts {
            out_path: out_path.into(),
            overwrite: self.overwrite,
            video_codec: self.encoder.video_codec.clone(),
            pix_fmt: self.encoder.pix_fmt.clone(),
            extra_args: self.encoder.extra_args.clone(),
        }
    }

    /// Compatibility pass, or `None` when disabled.
    pub fn compat_pass(&self) -> Option<FfmpegCompat> {
        self.compat.enabled.then(|| FfmpegCompat {
            video_codec: self.compat.video_codec.clone(),
            pix_fmt: self.compat.pix_fmt.clone(),
            faststart: self.compat.faststart,
        })
    }
}

fn deserialize_fps<'de, D>(deserializer: D) -> Result<Fps, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u32),
        Text(String),
        Rational { num: u32, den: u32 },
    }

    let fps = match Repr::deserialize(deserializer)? {
        Repr::Int(n) => Fps::integer(n),
        Repr::Text(s) => s.parse::<Fps>(),
        Repr::Rational { num, den } => Fps::new(num, den),
    };
    fps.map_err(serde::de::Error::custom)
}

fn serialize_fps<S>(fps: &Fps, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(fps)
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
