/// Convenience result type used across cuelist.
pub type CueResult<T> = Result<T, CueError>;

/// Top-level error taxonomy used by timeline, tempo and runner APIs.
#[derive(thiserror::Error, Debug)]
pub enum CueError {
    /// A clip reported a negative or non-finite duration.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// A tempo was non-positive or non-finite.
    #[error("invalid tempo: {0}")]
    InvalidTempo(String),

    /// A composition function was handed values it cannot merge.
    #[error("composition mismatch: {0}")]
    CompositionMismatch(String),

    /// A placement (or other lookup target) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A negative or non-finite time/beat argument.
    #[error("invalid time argument: {0}")]
    InvalidTimeArgument(String),

    /// Invalid runner or render configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Failures of the background playback loop itself.
    #[error("playback error: {0}")]
    Playback(String),

    /// Errors when serializing frames for a sink.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CueError {
    /// Build a [`CueError::InvalidDuration`] value.
    pub fn invalid_duration(msg: impl Into<String>) -> Self {
        Self::InvalidDuration(msg.into())
    }

    /// Build a [`CueError::InvalidTempo`] value.
    pub fn invalid_tempo(msg: impl Into<String>) -> Self {
        Self::InvalidTempo(msg.into())
    }

    /// Build a [`CueError::CompositionMismatch`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::CompositionMismatch(msg.into())
    }

    /// Build a [`CueError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`CueError::InvalidTimeArgument`] value.
    pub fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTimeArgument(msg.into())
    }

    /// Build a [`CueError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`CueError::Playback`] value.
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Build a [`CueError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
