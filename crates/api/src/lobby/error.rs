use core::fmt::{self, Display};
use model::validate;

#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    SessionActive,
}

impl Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SessionActive => "A quiz is already running! Wait for it to finish.",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreationError {
    NoContentAvailable,
    InvalidContent(validate::Error),
    EmptyContent,
    SessionActive,
}

impl Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContentAvailable => f.write_str("No quiz available for today. Use /generate to create one."),
            Self::InvalidContent(err) => write!(f, "Quiz format error: {err}"),
            Self::EmptyContent => f.write_str("Quiz format error: today's quiz has no questions."),
            Self::SessionActive => f.write_str("A quiz is already running!"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AdvanceError {
    NoSession,
    /// The session already moved past the question the caller was waiting on.
    StaleAlarm,
}

impl Display for AdvanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoSession => "no active session",
            Self::StaleAlarm => "session has already moved on",
        })
    }
}
