use super::{
    alarm::Alarm,
    error::{AdvanceError, CreationError, JoinError},
    session::{AnswerOutcome, ChatId, NextAction, PromptId, Reveal, Session, UserId},
    Config,
};
use dashmap::DashMap;
use db::ContentSet;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

#[derive(Default)]
struct Room {
    queue: BTreeSet<UserId>,
    session: Option<Session>,
}

impl Room {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.session.is_none()
    }
}

/// Read-only snapshot of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionView {
    pub chat: ChatId,
    pub current: usize,
    pub total: usize,
    pub answered: usize,
    pub prompt: Option<PromptId>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            chat: session.chat(),
            current: session.current_index(),
            total: session.len(),
            answered: session.answered(),
            prompt: session.outstanding(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Queued { size: usize },
    Started(SessionView),
    /// The quorum was reached but no session could be built. The queue has been reset.
    Aborted(CreationError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// `number` is one-based.
    Running { number: usize, total: usize },
    Waiting { queued: usize },
    Idle,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Advance {
    /// The question that just closed, if one was live.
    pub closed: Option<Reveal>,
    pub next: NextAction,
}

/// Picks the content set for a room. The same room always gets the same set for a given count.
pub fn select_content(chat: ChatId, count: usize) -> Option<usize> {
    // FNV-1a. The choice must survive restarts, so no per-process hash seed.
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    let hash = chat.get().to_be_bytes().iter().fold(OFFSET, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME));
    let count = u64::try_from(count).ok().filter(|&count| count > 0)?;
    usize::try_from(hash % count).ok()
}

/// Waiting queues and live sessions for every chat room. All operations on one room are
/// serialized by the room's map entry. Rooms never share locks with each other.
pub struct Registry {
    rooms: DashMap<ChatId, Room>,
    /// Routes answers to the room whose question is live.
    prompts: DashMap<PromptId, ChatId>,
    config: Config,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Self { rooms: DashMap::new(), prompts: DashMap::new(), config }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Adds `user` to the waiting queue of `chat`. The join that brings the queue to the quorum
    /// also builds the session from `content`. Joining twice counts once.
    pub fn request_join(&self, chat: ChatId, user: UserId, content: &[ContentSet]) -> Result<JoinOutcome, JoinError> {
        let mut room = self.rooms.entry(chat).or_default();
        if room.session.is_some() {
            return Err(JoinError::SessionActive);
        }

        room.queue.insert(user);
        let size = room.queue.len();
        if size < self.config.quorum {
            log::debug!("{user} is waiting in {chat} ({size}/{})", self.config.quorum);
            return Ok(JoinOutcome::Queued { size });
        }

        let result = self.install(&mut room, chat, content);
        if result.is_err() {
            room.queue.clear();
        }
        drop(room);

        Ok(match result {
            Ok(view) => JoinOutcome::Started(view),
            Err(err) => {
                log::warn!("cannot start a quiz in {chat}: {err}");
                self.prune(chat);
                JoinOutcome::Aborted(err)
            }
        })
    }

    /// Builds a session for `chat` straight away, bypassing the queue.
    pub fn create_session(&self, chat: ChatId, content: &[ContentSet]) -> Result<SessionView, CreationError> {
        let mut room = self.rooms.entry(chat).or_default();
        let result = self.install(&mut room, chat, content);
        if result.is_err() && room.session.is_none() {
            room.queue.clear();
        }
        drop(room);
        self.prune(chat);
        result
    }

    fn install(&self, room: &mut Room, chat: ChatId, content: &[ContentSet]) -> Result<SessionView, CreationError> {
        if room.session.is_some() {
            return Err(CreationError::SessionActive);
        }

        let set = select_content(chat, content.len())
            .and_then(|index| content.get(index))
            .ok_or(CreationError::NoContentAvailable)?;
        let mut questions = model::validate(set).map_err(CreationError::InvalidContent)?;
        if questions.is_empty() {
            return Err(CreationError::EmptyContent);
        }

        questions.truncate(self.config.max_questions);
        questions.shuffle(&mut rand::thread_rng());

        let session = Session::new(chat, questions, self.config.time_limit);
        let view = SessionView::from(&session);
        room.queue.clear();
        room.session = Some(session);
        log::info!("started a quiz of {} questions in {chat}", view.total);
        Ok(view)
    }

    /// Tears down the session of `chat` together with its pending alarm. Returns whether there
    /// was anything to tear down.
    pub fn end_session(&self, chat: ChatId) -> bool {
        let Some(mut room) = self.rooms.get_mut(&chat) else {
            return false;
        };

        room.queue.clear();
        let session = room.session.take();
        drop(room);
        self.prune(chat);

        let Some(session) = session else {
            return false;
        };

        if let Some(prompt) = session.outstanding() {
            self.prompts.remove(&prompt);
        }

        log::info!("ended the quiz in {chat}");
        true
    }

    fn prune(&self, chat: ChatId) {
        self.rooms.remove_if(&chat, |_, room| room.is_idle());
    }

    /// Moves the session of `chat` forward, provided it is still waiting on `expected`. A session
    /// that runs out of questions is removed before this returns.
    pub fn advance(&self, chat: ChatId, expected: Option<PromptId>) -> Result<Advance, AdvanceError> {
        let mut room = self.rooms.get_mut(&chat).ok_or(AdvanceError::NoSession)?;
        let session = room.session.as_mut().ok_or(AdvanceError::NoSession)?;
        if session.outstanding() != expected {
            return Err(AdvanceError::StaleAlarm);
        }

        let closed = session.reveal();
        let next = session.advance();

        if let Some(reveal) = &closed {
            self.prompts.remove(&reveal.prompt);
        }

        match &next {
            NextAction::Broadcast(prompt) => {
                self.prompts.insert(prompt.id, chat);
            }
            NextAction::Finish { total } => {
                room.session = None;
                room.queue.clear();
                drop(room);
                self.prune(chat);
                log::info!("finished a quiz of {total} questions in {chat}");
            }
        }

        Ok(Advance { closed, next })
    }

    pub fn record_answer(&self, prompt: PromptId, user: UserId) -> AnswerOutcome {
        let Some(chat) = self.prompts.get(&prompt).map(|entry| *entry.value()) else {
            return AnswerOutcome::Stale;
        };

        let Some(mut room) = self.rooms.get_mut(&chat) else {
            return AnswerOutcome::Stale;
        };

        room.session.as_mut().map_or(AnswerOutcome::Stale, |session| session.record_answer(prompt, user))
    }

    /// Hands `alarm` to the session of `chat` if it is still waiting on `expected`.
    pub(super) fn arm(&self, chat: ChatId, expected: Option<PromptId>, alarm: Alarm) -> bool {
        let Some(mut room) = self.rooms.get_mut(&chat) else {
            return false;
        };

        match room.session.as_mut() {
            Some(session) => session.arm(expected, alarm),
            None => false,
        }
    }

    pub fn session_for(&self, chat: ChatId) -> Option<SessionView> {
        self.rooms.get(&chat)?.session.as_ref().map(SessionView::from)
    }

    pub fn queue_size_for(&self, chat: ChatId) -> usize {
        self.rooms.get(&chat).map_or(0, |room| room.queue.len())
    }

    pub fn is_active(&self, chat: ChatId) -> bool {
        self.rooms.get(&chat).is_some_and(|room| room.session.is_some())
    }

    pub fn status(&self, chat: ChatId) -> Status {
        let Some(room) = self.rooms.get(&chat) else {
            return Status::Idle;
        };

        match &room.session {
            Some(session) => Status::Running { number: session.current_index() + 1, total: session.len() },
            None if room.queue.is_empty() => Status::Idle,
            None => Status::Waiting { queued: room.queue.len() },
        }
    }
}
