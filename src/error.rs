use thiserror::Error;

/// Live-output failures. Never fatal: the pipeline and export paths keep working.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("playback unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not ready: no source image loaded")]
    NotReady,
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),
}
