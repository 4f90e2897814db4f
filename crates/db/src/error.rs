use core::fmt::{self, Display};
use std::io;

#[derive(Debug)]
pub enum Error {
    /// The requested file or directory does not exist.
    NotFound,
    /// The caller supplied a name or content set we refuse to store.
    BadInput,
    /// Unexpected file system failure.
    Io(io::ErrorKind),
    /// The file does not hold well-formed JSON.
    Json,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            kind => Self::Io(kind),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(_: serde_json::Error) -> Self {
        Self::Json
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("Quiz file not found."),
            Self::BadInput => f.write_str("Refusing to store an unusable quiz."),
            Self::Io(kind) => write!(f, "Quiz storage failed: {kind}."),
            Self::Json => f.write_str("Quiz file is not valid JSON."),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
