use crate::foundation::error::{StoryreelError, StoryreelResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StoryreelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Hidden sibling path used while `out` is being written.
///
/// The name is unique per process and call, and keeps the `.mp4` extension so tools that sniff
/// extensions still see a video file.
pub fn partial_path_for(out: &Path, tag: &str) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    out.with_file_name(format!(
        ".{stem}.{tag}-{}-{nanos}.mp4",
        std::process::id()
    ))
}

/// Removes a file on drop unless disarmed.
#[derive(Debug)]
pub struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    /// Guard `path`.
    pub fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    /// Guarded path, while armed.
    pub fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }

    /// Keep the file; return its path.
    pub fn disarm(mut self) -> Option<PathBuf> {
        self.0.take()
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Exclusive claim on an output path for the lifetime of one render.
///
/// Backed by a `<out>.lock` file created with `create_new`, so a second render targeting the same
/// path fails fast instead of interleaving writes.
#[derive(Debug)]
pub struct OutputLock {
    lock_path: PathBuf,
}

impl OutputLock {
    /// Claim `out`.
    pub fn acquire(out: &Path) -> StoryreelResult<Self> {
        ensure_parent_dir(out)?;
        let mut name = out.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
            StoryreelError::validation(format!(
                "output path '{}' has no file name",
                out.display()
            ))
        })?;
        name.push(".lock");
        let lock_path = out.with_file_name(name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => Ok(Self { lock_path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoryreelError::encode(format!(
                    "output '{}' is already being rendered (lock '{}' exists)",
                    out.display(),
                    lock_path.display()
                )))
            }
            Err(e) => Err(StoryreelError::encode(format!(
                "cannot create lock file '{}': {e}",
                lock_path.display()
            ))),
        }
    }

    /// Path of the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/output.rs"]
mod tests;
