use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// Canonical schema for a multiple-choice question.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    /// Question to be displayed in chat.
    pub question: String,
    /// Possible answers to select from.
    pub options: Vec<String>,
    /// Index of the option with the correct answer.
    #[serde(rename = "answer_index")]
    pub answer: usize,
    /// Shown once the question closes. May be empty.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// The text of the correct option.
    pub fn correct(&self) -> Option<&str> {
        self.options.get(self.answer).map(String::as_str)
    }
}
