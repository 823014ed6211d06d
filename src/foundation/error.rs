/// Crate-wide result alias.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Error type for a single render invocation.
///
/// Each variant names the stage that failed so callers can tell configuration and data problems
/// apart from encoder problems.
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    /// Malformed storyboard, asset table or render configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A derived schedule broke its coverage invariant.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Encoder initialization, streaming or finalization failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other failure, usually I/O with an `anyhow` context chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    /// Build a [`StoryreelError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StoryreelError::Schedule`].
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Build a [`StoryreelError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`StoryreelError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
