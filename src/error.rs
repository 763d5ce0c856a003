//! Error types for the capture-to-speech pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias for `VisionSpeak` operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, recognizing, or narrating
#[derive(Debug, Error)]
pub enum Error {
    /// Capture could not be decoded or has zero area
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Connect, read, or write phase exceeded its bound
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// Transport failure before a response body was received
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body was not `{"text": "..."}`
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Play or repeat requested before any text was recognized
    #[error("no text to read")]
    NothingToNarrate,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JPEG encoding error
    #[error("encode error: {0}")]
    Encode(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio output error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`Error`], surfaced to callers alongside the message
///
/// Undocumented kinds mirror the [`Error`] variant of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Undecodable or zero-area capture
    InvalidImage,
    /// A network phase ran past its bound
    NetworkTimeout,
    /// Transport failure
    NetworkError,
    /// Reply was not `{"text": "..."}`
    MalformedResponse,
    /// Advisory: nothing stored to read
    NothingToNarrate,
    Config,
    Encode,
    Tts,
    Audio,
    Io,
}

impl Error {
    /// Kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidImage(_) => ErrorKind::InvalidImage,
            Self::NetworkTimeout(_) => ErrorKind::NetworkTimeout,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::NothingToNarrate => ErrorKind::NothingToNarrate,
            Self::Config(_) => ErrorKind::Config,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Tts(_) => ErrorKind::Tts,
            Self::Audio(_) => ErrorKind::Audio,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error is an advisory rather than a pipeline failure
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        matches!(self, Self::NothingToNarrate)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::NetworkTimeout(e.to_string())
        } else {
            Self::NetworkError(e.to_string())
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidImage => "InvalidImage",
            Self::NetworkTimeout => "NetworkTimeout",
            Self::NetworkError => "NetworkError",
            Self::MalformedResponse => "MalformedResponse",
            Self::NothingToNarrate => "NothingToNarrate",
            Self::Config => "Config",
            Self::Encode => "Encode",
            Self::Tts => "Tts",
            Self::Audio => "Audio",
            Self::Io => "Io",
        };
        f.write_str(name)
    }
}
