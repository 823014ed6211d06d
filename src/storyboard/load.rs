use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::storyboard::model::Storyboard;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

impl Storyboard {
    /// Parse and validate a storyboard from a JSON reader.
    ///
    /// This is the single ingestion point: once it returns, the storyboard is never re-parsed.
    pub fn from_reader<R: std::io::Read>(r: R) -> StoryreelResult<Self> {
        let sb: Storyboard = serde_json::from_reader(r)
            .map_err(|e| StoryreelError::serde(format!("parse storyboard JSON: {e}")))?;
        sb.validate()?;
        Ok(sb)
    }

    /// Parse and validate a storyboard from a JSON string.
    pub fn from_json_str(s: &str) -> StoryreelResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse and validate a storyboard from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StoryreelError::validation(format!("open storyboard JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> StoryreelResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StoryreelError::serde(format!("serialize storyboard JSON: {e}")))
    }
}
