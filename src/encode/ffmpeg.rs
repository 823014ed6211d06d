use crate::encode::output::{TempFileGuard, ensure_parent_dir, partial_path_for};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::render::compose::FrameRgb;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// `ffmpeg` video encoder name.
    pub video_codec: String,
    /// Output pixel format.
    pub pix_fmt: String,
    /// Extra encoder arguments placed before the output path.
    pub extra_args: Vec<String>,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    ///
    /// The default encoder is `mpeg4`, which every `ffmpeg` build ships; the compatibility
    /// pass re-encodes to H.264 when it is available.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            video_codec: "mpeg4".to_owned(),
            pix_fmt: "yuv420p".to_owned(),
            extra_args: vec!["-q:v".to_owned(), "2".to_owned()],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGB frames to its stdin.
///
/// Frames are encoded into a hidden sibling file which is renamed onto `out_path` only after
/// `ffmpeg` exits successfully. If the render fails or the sink is dropped early, the partial
/// file is removed, so `out_path` never holds a half-written video.
///
/// The sink does not lock `out_path`; see [`crate::encode::output::OutputLock`].
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    partial: Option<TempFileGuard>,

    frame_len: usize,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            partial: None,
            frame_len: 0,
            cfg: None,
            last_idx: None,
            frames_written: 0,
        }
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()> {
        if self.child.is_some() {
            return Err(StoryreelError::encode("ffmpeg sink already started"));
        }
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(StoryreelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(StoryreelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(StoryreelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(StoryreelError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let partial = TempFileGuard::new(partial_path_for(&self.opts.out_path, "partial"));
        let partial_path = partial
            .path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| StoryreelError::encode("partial output path missing (unexpected)"))?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // The partial file is ours alone, so always overwrite it.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an", "-c:v", &self.opts.video_codec])
            .args(["-pix_fmt", &self.opts.pix_fmt])
            .args(&self.opts.extra_args);
        push_output_fps(&mut cmd, cfg.fps);
        cmd.args(["-f", "mp4"]).arg(&partial_path);

        tracing::debug!(codec = %self.opts.video_codec, out = %partial_path.display(), "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            StoryreelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StoryreelError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StoryreelError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.frame_len = (cfg.width as usize) * (cfg.height as usize) * 3;
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.partial = Some(partial);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames_written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StoryreelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StoryreelError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(StoryreelError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(StoryreelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.frame_len {
            return Err(StoryreelError::validation(
                "frame.data size mismatch with width*height*3",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StoryreelError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            StoryreelError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.last_idx = Some(idx);
        self.frames_written += 1;
        Ok(())
    }

    fn end(&mut self) -> StoryreelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StoryreelError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            StoryreelError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StoryreelError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StoryreelError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        let partial = self
            .partial
            .take()
            .ok_or_else(|| StoryreelError::encode("partial output missing (unexpected)"))?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StoryreelError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let partial_path = partial
            .path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| StoryreelError::encode("partial output missing (unexpected)"))?;
        let size = std::fs::metadata(&partial_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(StoryreelError::encode(format!(
                "ffmpeg produced an empty file for '{}'",
                self.opts.out_path.display()
            )));
        }

        std::fs::rename(&partial_path, &self.opts.out_path).map_err(|e| {
            StoryreelError::encode(format!(
                "failed to move encoded video into '{}': {e}",
                self.opts.out_path.display()
            ))
        })?;
        partial.disarm();
        tracing::debug!(frames = self.frames_written(), out = %self.opts.out_path.display(), "ffmpeg finished");

        self.cfg = None;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Abandoned mid-render: stop ffmpeg before the partial guard deletes its output.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, use `-r` before `-i` to specify the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn push_output_fps(cmd: &mut Command, fps: Fps) {
    // Pin the output rate so the container never drops or duplicates frames.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
