use std::fmt;
use std::path::PathBuf;

/// A fatal run error. Every variant aborts the run before an output
/// image is written; there is no retry or recovery path.
#[derive(Clone, Debug)]
pub enum Error {
    /// Bad run configuration: unknown layer name, zero report interval,
    /// non-finite weight, mismatched tensor shape.
    Config(String),
    /// Image file could not be read, decoded, or written.
    Image { path: PathBuf, reason: String },
    /// Extractor weight file could not be loaded.
    Weights(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn image(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Image {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(message) => write!(f, "configuration error: {}", message),
            Self::Image { path, reason } => {
                write!(f, "image error at '{}': {}", path.display(), reason)
            }
            Self::Weights(message) => write!(f, "weight file error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
