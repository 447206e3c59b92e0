use serde::Serialize;
use thiserror::Error;

/// Errors raised while scrambling a single image.
///
/// The batch pipeline catches these per file; single-file callers get them
/// back unchanged.
#[derive(Error, Debug)]
pub enum ScrambleError {
    /// Extension not on the allow-list, or a decoded pixel layout JPEG cannot carry.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The input bytes are not a readable image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// An EXIF tree that cannot be laid out as a valid TIFF structure.
    #[error("cannot serialize EXIF: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ScrambleError`], used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    Decode,
    Format,
    Io,
}

impl ScrambleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Format(_) => ErrorKind::Format,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::Decode => "decode error",
            Self::Format => "format error",
            Self::Io => "I/O error",
        };
        f.write_str(name)
    }
}

impl From<image::ImageError> for ScrambleError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;
        match err {
            ImageError::Decoding(e) => Self::Decode(e.to_string()),
            ImageError::Unsupported(e) => Self::UnsupportedFormat(e.to_string()),
            ImageError::IoError(e) => Self::Io(e),
            ImageError::Limits(e) => Self::UnsupportedFormat(e.to_string()),
            ImageError::Parameter(e) => Self::UnsupportedFormat(e.to_string()),
            ImageError::Encoding(e) => Self::Io(std::io::Error::other(e.to_string())),
        }
    }
}

/// Result alias for the scrambling core.
pub type Result<T> = std::result::Result<T, ScrambleError>;
