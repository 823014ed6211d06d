use crate::foundation::error::{StoryreelError, StoryreelResult};
use serde::{Deserialize, Serialize};

/// Offset from the start of the video, in seconds.
///
/// Textual forms are `ss`, `mm:ss` and `hh:mm:ss`, each with an optional fractional seconds part
/// (`00:02.5`). A bare JSON number is read as seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Timecode(f64);

impl Timecode {
    /// Zero offset.
    pub const ZERO: Timecode = Timecode(0.0);

    /// Build from seconds; negative and non-finite values are rejected.
    pub fn from_secs(secs: f64) -> StoryreelResult<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(StoryreelError::validation(format!(
                "timecode must be a finite, non-negative number of seconds (got {secs})"
            )));
        }
        Ok(Self(secs))
    }

    /// Offset in seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Parse `ss`, `mm:ss` or `hh:mm:ss` with an optional fractional seconds part.
    pub fn parse(s: &str) -> StoryreelResult<Self> {
        let s = s.trim();
        let bad = || StoryreelError::validation(format!("invalid timecode \"{s}\""));
        if s.is_empty() {
            return Err(bad());
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(bad());
        }

        let (head, last) = parts.split_at(parts.len() - 1);
        let secs_part = last[0].trim();
        if secs_part.is_empty() || secs_part.starts_with(['-', '+']) {
            return Err(bad());
        }
        let secs: f64 = secs_part.parse().map_err(|_| bad())?;
        if !head.is_empty() && secs >= 60.0 {
            return Err(bad());
        }

        let mut total = secs;
        let mut unit = 60.0;
        for (i, part) in head.iter().rev().enumerate() {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            let v: u64 = part.parse().map_err(|_| bad())?;
            // Minutes are bounded only when an hours field is present.
            if i == 0 && head.len() == 2 && v >= 60 {
                return Err(bad());
            }
            total += v as f64 * unit;
            unit *= 60.0;
        }

        Self::from_secs(total)
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let millis = (self.0 * 1000.0).round() as u64;
        let (whole, frac) = (millis / 1000, millis % 1000);
        let (h, m, s) = (whole / 3600, (whole / 60) % 60, whole % 60);
        if h > 0 {
            write!(f, "{h:02}:{m:02}:{s:02}")?;
        } else {
            write!(f, "{m:02}:{s:02}")?;
        }
        if frac > 0 {
            let frac = format!("{frac:03}");
            write!(f, ".{}", frac.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Timecode {
    type Err = StoryreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timecode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timecode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Secs(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Secs(secs) => Timecode::from_secs(secs).map_err(serde::de::Error::custom),
            Repr::Text(s) => Timecode::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// One timed media reference.
///
/// `start`/`end` may be omitted; missing timing is synthesized when the timeline is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryboardEntry {
    /// Offset at which the media appears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timecode>,
    /// Offset at which the media disappears (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timecode>,
    /// Media identifier, looked up in an [`crate::AssetResolution`].
    #[serde(alias = "media", alias = "file", alias = "image")]
    pub media_ref: String,
    /// Free-text description carried alongside the entry. Never rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StoryboardEntry {
    /// Entry shown from `start` to `end` (seconds).
    pub fn timed(start: f64, end: f64, media_ref: impl Into<String>) -> StoryreelResult<Self> {
        Ok(Self {
            start: Some(Timecode::from_secs(start)?),
            end: Some(Timecode::from_secs(end)?),
            media_ref: media_ref.into(),
            description: None,
        })
    }

    /// Entry without explicit timing.
    pub fn untimed(media_ref: impl Into<String>) -> Self {
        Self {
            start: None,
            end: None,
            media_ref: media_ref.into(),
            description: None,
        }
    }
}

/// Ordered list of timed media references describing one output video.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Storyboard {
    /// Entries in storyboard order.
    #[serde(default, alias = "media")]
    pub entries: Vec<StoryboardEntry>,
    /// Caller-declared total duration in seconds.
    #[serde(
        default,
        alias = "duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    /// Narrative script the storyboard was written for. Never rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Storyboard {
    /// Storyboard from entries, with the duration inferred from them.
    pub fn new(entries: Vec<StoryboardEntry>) -> Self {
        Self {
            entries,
            duration: None,
            script: None,
        }
    }

    /// Set the declared total duration in seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Check the invariants that cannot be recovered during scheduling.
    ///
    /// Timecodes are checked when parsed. Inverted or zero-length entries are not errors here;
    /// the timeline clamps them.
    pub fn validate(&self) -> StoryreelResult<()> {
        if let Some(d) = self.duration
            && (!d.is_finite() || d < 0.0)
        {
            return Err(StoryreelError::validation(format!(
                "storyboard duration must be a finite, non-negative number of seconds (got {d})"
            )));
        }
        Ok(())
    }

    /// Total target duration in seconds.
    ///
    /// Resolution order: declared duration, then the latest explicit `end`, then one
    /// `default_clip_secs` per entry when nothing is timed.
    pub fn target_duration_secs(&self, default_clip_secs: f64) -> f64 {
        if let Some(d) = self.duration {
            return d;
        }

        let max_end = self
            .entries
            .iter()
            .filter_map(|e| e.end)
            .map(Timecode::as_secs)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
        if let Some(end) = max_end {
            return end;
        }

        if self.entries.is_empty() {
            return 0.0;
        }
        let by_count = self.entries.len() as f64 * default_clip_secs;
        let by_start = self
            .entries
            .iter()
            .filter_map(|e| e.start)
            .map(|t| t.as_secs() + default_clip_secs)
            .fold(0.0, f64::max);
        by_count.max(by_start)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/storyboard/model.rs"]
mod tests;
