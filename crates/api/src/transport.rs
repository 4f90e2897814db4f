//! Seams between the quiz orchestration and the outside world.

use crate::lobby::{ChatId, Prompt, PromptId};
use async_trait::async_trait;
use core::fmt::{self, Display};
use db::{ContentSet, Library};

#[derive(Debug, PartialEq, Eq)]
pub enum DeliveryError {
    /// The chat platform refused the message as malformed.
    Rejected,
    /// The chat platform could not be reached or answered with an error.
    Unavailable,
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rejected => "the question was rejected by the chat platform",
            Self::Unavailable => "the chat platform is unavailable",
        })
    }
}

/// Delivers quiz traffic to a chat room.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Puts a question in front of the room. Answers must come back tagged with `prompt.id`.
    async fn broadcast_poll(&self, chat: ChatId, prompt: &Prompt) -> Result<(), DeliveryError>;
    /// Stops accepting answers on a previously broadcast question. Best effort.
    async fn close_poll(&self, chat: ChatId, prompt: PromptId);
    /// Best effort.
    async fn send_notice(&self, chat: ChatId, text: &str);
}

/// Source of the content sets published for a period.
#[async_trait]
pub trait Content: Send + Sync + 'static {
    async fn load_content_for_period(&self, period: &str) -> Vec<ContentSet>;
}

#[async_trait]
impl Content for Library {
    async fn load_content_for_period(&self, period: &str) -> Vec<ContentSet> {
        Library::load_content_for_period(self, period).await.unwrap_or_else(|err| {
            log::error!("cannot load quizzes for {period}: {err}");
            Vec::new()
        })
    }
}
