use core::fmt::{self, Display};

pub enum Error {
    UnsupportedInteraction,
    InvalidParams,
    UnknownUser,
    UnknownChannel,
    UnknownCommandName,
    Storage,
    Fatal,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedInteraction => "Unsupported interaction.",
            Self::InvalidParams => "Invalid parameter list.",
            Self::UnknownUser => "Unknown user.",
            Self::UnknownChannel => "Quizzes can only be played in a channel.",
            Self::UnknownCommandName => "Unknown command name.",
            Self::Storage => "We could not access the quiz library on our end.",
            Self::Fatal => "Oops! We have encountered an unrecoverable error on our end.",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
