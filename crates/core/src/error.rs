use crate::assets::LoadFailure;

/// Result alias that carries the custom [`MetronomeError`] type.
pub type Result<T> = std::result::Result<T, MetronomeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// One or both sample assets failed to fetch or decode.
    #[error(transparent)]
    Load(#[from] LoadFailure),
    /// The requested note is not part of the frequency table.
    #[error("unknown note `{0}`")]
    UnknownNote(String),
    /// The audio clock could not be resumed.
    #[error("failed to resume audio clock: {0}")]
    ClockResume(String),
    /// Playback features were requested before both samples were loaded.
    #[error("sample buffers are not loaded")]
    NotReady,
    /// Tempo edits are locked while the metronome is running.
    #[error("tempo cannot be changed while the metronome is running")]
    TempoLocked,
    #[error("tempo {bpm} BPM is outside {min}..={max}")]
    TempoOutOfRange { bpm: u32, min: u32, max: u32 },
    #[error("volume {0} is outside 0..=100")]
    VolumeOutOfRange(u32),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form message, mostly surfaced by output backends.
    #[error("{0}")]
    Message(String),
}

impl MetronomeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for MetronomeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MetronomeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
