use crate::encode::ffmpeg::is_ffmpeg_on_path;
use crate::encode::output::{TempFileGuard, partial_path_for};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use std::path::Path;
use std::process::{Command, Stdio};

/// Post-processing applied to a finished output file.
///
/// Implementations must either replace `path` with a complete new file or leave it untouched.
/// Callers treat an error as "keep the original".
pub trait PostProcess {
    /// Short name for logs and reports.
    fn name(&self) -> &str;
    /// Rewrite the video at `path` in place.
    fn apply(&self, path: &Path) -> StoryreelResult<()>;
}

/// Re-encode through `ffmpeg` for broad playback compatibility.
///
/// Defaults to H.264 in `yuv420p` with the `moov` atom moved to the front (`+faststart`) so
/// playback can start before the whole file is downloaded.
#[derive(Clone, Debug)]
pub struct FfmpegCompat {
    /// Target video encoder.
    pub video_codec: String,
    /// Target pixel format.
    pub pix_fmt: String,
    /// Move the index to the start of the file.
    pub faststart: bool,
}

impl Default for FfmpegCompat {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_owned(),
            pix_fmt: "yuv420p".to_owned(),
            faststart: true,
        }
    }
}

impl PostProcess for FfmpegCompat {
    fn name(&self) -> &str {
        "ffmpeg-compat"
    }

    fn apply(&self, path: &Path) -> StoryreelResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(StoryreelError::encode(
                "ffmpeg is required for the compatibility pass, but was not found on PATH",
            ));
        }

        let tmp = TempFileGuard::new(partial_path_for(path, "compat"));
        let tmp_path = tmp
            .path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| StoryreelError::encode("compat output path missing (unexpected)"))?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-an", "-c:v", &self.video_codec, "-pix_fmt", &self.pix_fmt]);
        if self.faststart {
            cmd.args(["-movflags", "+faststart"]);
        }
        cmd.args(["-f", "mp4"]).arg(&tmp_path);

        let output = cmd.output().map_err(|e| {
            StoryreelError::encode(format!("failed to spawn ffmpeg for compatibility pass: {e}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoryreelError::encode(format!(
                "compatibility pass exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let size = std::fs::metadata(&tmp_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(StoryreelError::encode(
                "compatibility pass produced an empty file",
            ));
        }

        std::fs::rename(&tmp_path, path).map_err(|e| {
            StoryreelError::encode(format!(
                "failed to replace '{}' with compatible encode: {e}",
                path.display()
            ))
        })?;
        tmp.disarm();
        Ok(())
    }
}

/// Run `post` on `path`, keeping the original file when it fails.
///
/// Returns `true` when the pass completed.
pub fn apply_best_effort(post: &dyn PostProcess, path: &Path) -> bool {
    match post.apply(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(stage = post.name(), out = %path.display(), error = %e, "post-processing failed, keeping original output");
            false
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/post.rs"]
mod tests;
