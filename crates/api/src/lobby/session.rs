use super::alarm::Alarm;
use model::Question;
use std::{
    collections::HashSet,
    fmt::{self, Display},
    num::ParseIntError,
    str::FromStr,
    time::Duration,
};
use twilight_model::id::{
    marker::{ChannelMarker, UserMarker},
    Id,
};

pub type ChatId = Id<ChannelMarker>;
pub type UserId = Id<UserMarker>;

/// Correlates an answer with the exact question it was given for. A fresh one is drawn whenever
/// a question goes out, so answers to older questions can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PromptId(u64);

impl PromptId {
    pub fn fresh() -> Self {
        Self(rand::random())
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for PromptId {
    type Err = ParseIntError;
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.parse().map(Self)
    }
}

/// Everything the transport needs to put one question in front of the room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub id: PromptId,
    /// One-based position of the question within the session.
    pub number: usize,
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option.
    pub answer: usize,
    pub explanation: String,
    pub time_limit: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub enum NextAction {
    Broadcast(Prompt),
    /// No questions remain. The caller must end the session.
    Finish { total: usize },
}

/// The solution to a question that is about to close.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reveal {
    pub prompt: PromptId,
    pub answer: String,
    pub explanation: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Accepted,
    /// The participant already answered this question. Only the first answer counts.
    Duplicate,
    /// The answer refers to a question that is no longer live.
    Stale,
}

/// One quiz run in one chat room.
pub struct Session {
    chat: ChatId,
    questions: Box<[Question]>,
    /// Index of the live question. Equal to `questions.len()` once the run is over.
    cursor: usize,
    answered: HashSet<UserId>,
    prompt: Option<PromptId>,
    time_limit: Duration,
    /// Pending wake-up for this session. Dropping it cancels the wake-up.
    alarm: Option<Alarm>,
}

impl Session {
    pub fn new(chat: ChatId, questions: Vec<Question>, time_limit: Duration) -> Self {
        Self {
            chat,
            questions: questions.into_boxed_slice(),
            cursor: 0,
            answered: HashSet::new(),
            prompt: None,
            time_limit,
            alarm: None,
        }
    }

    pub const fn chat(&self) -> ChatId {
        self.chat
    }

    pub const fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.questions.len()
    }

    /// The prompt that answers are currently accepted for.
    pub const fn outstanding(&self) -> Option<PromptId> {
        self.prompt
    }

    pub fn answered(&self) -> usize {
        self.answered.len()
    }

    /// Moves past the live question (if any) and either issues the next one or reports that the
    /// run is over. The first call issues the first question.
    pub fn advance(&mut self) -> NextAction {
        if self.prompt.take().is_some() {
            self.cursor += 1;
        }

        self.answered.clear();
        self.alarm = None;

        let Some(question) = self.questions.get(self.cursor) else {
            return NextAction::Finish { total: self.questions.len() };
        };

        let id = PromptId::fresh();
        self.prompt = Some(id);
        NextAction::Broadcast(Prompt {
            id,
            number: self.cursor + 1,
            question: question.question.clone(),
            options: question.options.clone(),
            answer: question.answer,
            explanation: question.explanation.clone(),
            time_limit: self.time_limit,
        })
    }

    pub fn record_answer(&mut self, prompt: PromptId, user: UserId) -> AnswerOutcome {
        if self.prompt != Some(prompt) {
            return AnswerOutcome::Stale;
        }

        if self.answered.insert(user) {
            AnswerOutcome::Accepted
        } else {
            AnswerOutcome::Duplicate
        }
    }

    pub fn reveal(&self) -> Option<Reveal> {
        let prompt = self.prompt?;
        let question = self.questions.get(self.cursor)?;
        Some(Reveal {
            prompt,
            answer: question.correct()?.into(),
            explanation: question.explanation.clone(),
        })
    }

    /// Keeps `alarm` alive as long as the session is still waiting on `expected`. Otherwise the
    /// alarm is dropped (and thus cancelled) and `false` is returned.
    pub(super) fn arm(&mut self, expected: Option<PromptId>, alarm: Alarm) -> bool {
        if self.is_finished() || self.prompt != expected {
            return false;
        }

        self.alarm = Some(alarm);
        true
    }
}
