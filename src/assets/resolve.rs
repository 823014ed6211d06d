use crate::foundation::error::{StoryreelError, StoryreelResult};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Outcome of looking up one media reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Locally readable path for the reference.
    Found(PathBuf),
    /// No local asset is known for the reference.
    Missing,
}

impl Resolved {
    /// The resolved path, if any.
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Resolved::Found(p) => Some(p),
            Resolved::Missing => None,
        }
    }
}

/// Mapping from storyboard media references to local asset paths.
///
/// Built by whoever downloads or stages the media; the renderer only reads it. Lookups never
/// touch the filesystem, so a path that does not exist still resolves and fails later at decode
/// time, where it is downgraded to gap-fill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetResolution {
    table: BTreeMap<String, PathBuf>,
    base_dir: Option<PathBuf>,
    passthrough: bool,
}

impl AssetResolution {
    /// Empty table: every reference is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table in which references not listed explicitly are taken to be local paths themselves.
    ///
    /// Remote identifiers (anything containing `://`) are never passed through.
    pub fn passthrough() -> Self {
        Self {
            passthrough: true,
            ..Self::default()
        }
    }

    /// Resolve relative asset paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Add or replace one mapping.
    pub fn insert(&mut self, media_ref: impl Into<String>, path: impl Into<PathBuf>) {
        self.table.insert(media_ref.into(), path.into());
    }

    /// Number of explicit mappings.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Return `true` when there are no explicit mappings.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Look up `media_ref`.
    pub fn resolve(&self, media_ref: &str) -> Resolved {
        if let Some(path) = self.table.get(media_ref) {
            return Resolved::Found(self.anchor(path));
        }

        let key = media_ref.trim();
        if self.passthrough && !key.is_empty() && !key.contains("://") {
            return Resolved::Found(self.anchor(Path::new(key)));
        }
        Resolved::Missing
    }

    fn anchor(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Parse a JSON object of `{"media_ref": "path", ...}` pairs.
    pub fn from_reader<R: std::io::Read>(r: R) -> StoryreelResult<Self> {
        let table: BTreeMap<String, PathBuf> = serde_json::from_reader(r)
            .map_err(|e| StoryreelError::serde(format!("parse asset table JSON: {e}")))?;
        Ok(Self {
            table,
            ..Self::default()
        })
    }

    /// Load a JSON asset table; relative paths resolve against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StoryreelError::validation(format!("open asset table JSON '{}': {e}", path.display()))
        })?;
        let res = Self::from_reader(BufReader::new(f))?;
        Ok(match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => res.with_base_dir(dir),
            _ => res,
        })
    }
}

impl<K, V> FromIterator<(K, V)> for AssetResolution
where
    K: Into<String>,
    V: Into<PathBuf>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut res = Self::new();
        for (k, v) in iter {
            res.insert(k, v);
        }
        res
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolve.rs"]
mod tests;
