use crate::quiz::Question;
use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display};
use serde_json::Value;

/// Every question must offer at least this many options.
pub const MIN_OPTIONS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The element is not a JSON object.
    NotAnObject,
    /// One of `question`, `options`, or `answer_index` is absent.
    MissingField(&'static str),
    /// The field is present but holds the wrong type of value.
    InvalidField(&'static str),
    TooFewOptions,
    /// The `answer_index` is not an integer in `[0, options.len())`.
    IndexOutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error {
    /// One-based position of the first offending question.
    pub position: usize,
    pub kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { position, kind } = *self;
        match kind {
            ErrorKind::NotAnObject => write!(f, "Question {position} is not an object."),
            ErrorKind::MissingField(field) => write!(f, "Question {position} is missing required field: {field}."),
            ErrorKind::InvalidField(field) => write!(f, "Question {position} has an invalid `{field}` field."),
            ErrorKind::TooFewOptions => write!(f, "Question {position} must have at least {MIN_OPTIONS} options."),
            ErrorKind::IndexOutOfRange => write!(f, "Question {position} has an invalid answer_index."),
        }
    }
}

pub(crate) fn check(item: &Value) -> Result<Question, ErrorKind> {
    let map = item.as_object().ok_or(ErrorKind::NotAnObject)?;
    let question = map.get("question").ok_or(ErrorKind::MissingField("question"))?;
    let options = map.get("options").ok_or(ErrorKind::MissingField("options"))?;
    let answer = map.get("answer_index").ok_or(ErrorKind::MissingField("answer_index"))?;

    let question = question.as_str().filter(|text| !text.is_empty()).ok_or(ErrorKind::InvalidField("question"))?;
    let options = options.as_array().ok_or(ErrorKind::TooFewOptions)?;
    if options.len() < MIN_OPTIONS {
        return Err(ErrorKind::TooFewOptions);
    }

    let answer = answer
        .as_u64()
        .and_then(|index| usize::try_from(index).ok())
        .filter(|&index| index < options.len())
        .ok_or(ErrorKind::IndexOutOfRange)?;

    let options = options
        .iter()
        .map(|option| option.as_str().map(String::from))
        .collect::<Option<Vec<_>>>()
        .ok_or(ErrorKind::InvalidField("options"))?;

    let explanation = match map.get("explanation") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(ErrorKind::InvalidField("explanation")),
    };

    Ok(Question { question: question.into(), options, answer, explanation })
}

/// Checks every element against the canonical schema. Reports the first failing element and
/// otherwise yields the typed questions. The input is never modified.
pub fn validate(items: &[Value]) -> Result<Vec<Question>, Error> {
    items.iter().zip(1..).map(|(item, position)| check(item).map_err(|kind| Error { position, kind })).collect()
}
