mod alarm;
pub mod error;
mod registry;
mod session;

pub use registry::{select_content, Advance, JoinOutcome, Registry, SessionView, Status};
pub use session::{AnswerOutcome, ChatId, NextAction, Prompt, PromptId, Reveal, Session, UserId};

use crate::transport::{Content, Transport};
use alarm::Alarm;
use std::{sync::Arc, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of distinct participants needed to start a quiz.
    pub quorum: usize,
    /// Longer content sets are cut down to this many questions.
    pub max_questions: usize,
    pub time_limit: Duration,
    /// Extra time past the limit before a question closes.
    pub grace: Duration,
    /// Pause between the start announcement and the first question.
    pub intro_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quorum: 5,
            max_questions: 10,
            time_limit: Duration::from_secs(15),
            grace: Duration::from_secs(1),
            intro_delay: Duration::from_secs(2),
        }
    }
}

struct Inner<T, C> {
    registry: Registry,
    transport: T,
    content: C,
}

/// Drives quiz sessions: turns joins into sessions, runs the question timers, and routes
/// answers. Cloning is cheap and every clone drives the same rooms.
pub struct Lobby<T, C> {
    inner: Arc<Inner<T, C>>,
}

impl<T, C> Clone for Lobby<T, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Transport, C: Content> Lobby<T, C> {
    pub fn new(transport: T, content: C, config: Config) -> Self {
        Self { inner: Arc::new(Inner { registry: Registry::new(config), transport, content }) }
    }

    pub fn config(&self) -> &Config {
        self.inner.registry.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn content(&self) -> &C {
        &self.inner.content
    }

    pub async fn on_join(&self, chat: ChatId, user: UserId) -> Result<JoinOutcome, error::JoinError> {
        let registry = &self.inner.registry;
        if registry.is_active(chat) {
            return Err(error::JoinError::SessionActive);
        }

        let content = self.inner.content.load_content_for_period(&db::today()).await;
        let outcome = registry.request_join(chat, user, &content)?;
        drop(content);

        match &outcome {
            JoinOutcome::Queued { .. } => {}
            JoinOutcome::Started(view) => {
                let config = self.config();
                let text = format!(
                    "Quiz started! {} questions, {} seconds per question. Let's begin!",
                    view.total,
                    config.time_limit.as_secs()
                );
                self.notify(chat, text);
                self.schedule(chat, None, config.intro_delay);
            }
            JoinOutcome::Aborted(err) => self.notify(chat, err.to_string()),
        }

        Ok(outcome)
    }

    pub fn on_answer(&self, prompt: PromptId, user: UserId, choice: usize) -> AnswerOutcome {
        let outcome = self.inner.registry.record_answer(prompt, user);
        log::debug!("{user} picked option {choice} for {prompt}: {outcome:?}");
        outcome
    }

    pub fn status(&self, chat: ChatId) -> Status {
        self.inner.registry.status(chat)
    }

    /// Sends a notice in the background so that callers are not held up by the chat platform.
    fn notify(&self, chat: ChatId, text: String) {
        let lobby = self.clone();
        tokio::spawn(async move { lobby.inner.transport.send_notice(chat, &text).await });
    }

    fn schedule(&self, chat: ChatId, expected: Option<PromptId>, delay: Duration) {
        let lobby = self.clone();
        let alarm = Alarm::new(delay, Box::pin(async move { lobby.on_timer(chat, expected).await }));
        if !self.inner.registry.arm(chat, expected, alarm) {
            log::debug!("the quiz in {chat} moved on before its timer was set");
        }
    }

    async fn on_timer(self, chat: ChatId, expected: Option<PromptId>) {
        let Advance { closed, next } = match self.inner.registry.advance(chat, expected) {
            Ok(advance) => advance,
            Err(err) => {
                log::debug!("ignoring timer for {chat}: {err}");
                return;
            }
        };

        if let Some(reveal) = closed {
            self.close(chat, reveal).await;
        }

        self.deliver(chat, next).await;
    }

    async fn close(&self, chat: ChatId, Reveal { prompt, answer, explanation }: Reveal) {
        let transport = &self.inner.transport;
        transport.close_poll(chat, prompt).await;
        let text = if explanation.is_empty() {
            format!("The correct answer was ||{answer}||.")
        } else {
            format!("The correct answer was ||{answer}||. {explanation}")
        };
        transport.send_notice(chat, &text).await;
    }

    async fn deliver(&self, chat: ChatId, action: NextAction) {
        let transport = &self.inner.transport;
        match action {
            NextAction::Finish { total } => {
                let text = format!("Quiz completed! Total questions: {total}. Use /join to start a new quiz.");
                transport.send_notice(chat, &text).await;
            }
            NextAction::Broadcast(prompt) => match transport.broadcast_poll(chat, &prompt).await {
                Ok(()) => self.schedule(chat, Some(prompt.id), prompt.time_limit + self.config().grace),
                Err(err) => {
                    log::error!("abandoning the quiz in {chat}: {err}");
                    self.inner.registry.end_session(chat);
                    transport.send_notice(chat, &format!("Error sending question: {err}.")).await;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DeliveryError;
    use async_trait::async_trait;
    use db::ContentSet;
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };
    use tokio::time;
    use twilight_model::id::Id;

    const CHAT: ChatId = Id::new(42);

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Poll(usize),
        Close,
        Notice(String),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        broken: AtomicBool,
        /// How long each notice takes to go out.
        notice_delay: Duration,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn broadcast_poll(&self, _: ChatId, prompt: &Prompt) -> Result<(), DeliveryError> {
            if self.broken.load(Ordering::Acquire) {
                return Err(DeliveryError::Unavailable);
            }
            self.calls.lock().unwrap().push(Call::Poll(prompt.number));
            Ok(())
        }

        async fn close_poll(&self, _: ChatId, _: PromptId) {
            self.calls.lock().unwrap().push(Call::Close);
        }

        async fn send_notice(&self, _: ChatId, text: &str) {
            if !self.notice_delay.is_zero() {
                time::sleep(self.notice_delay).await;
            }
            self.calls.lock().unwrap().push(Call::Notice(text.into()));
        }
    }

    struct Shelf(Vec<ContentSet>);

    #[async_trait]
    impl Content for Shelf {
        async fn load_content_for_period(&self, _: &str) -> Vec<ContentSet> {
            self.0.clone()
        }
    }

    fn content(count: usize) -> ContentSet {
        (1..=count)
            .map(|n| json!({ "question": format!("Question {n}?"), "options": ["right", "wrong"], "answer_index": 0 }))
            .collect()
    }

    fn lobby(sets: Vec<ContentSet>) -> Lobby<Recorder, Shelf> {
        Lobby::new(Recorder::default(), Shelf(sets), Config::default())
    }

    async fn start(lobby: &Lobby<Recorder, Shelf>) -> SessionView {
        for user in 1..=4 {
            let outcome = lobby.on_join(CHAT, Id::new(user)).await.unwrap();
            assert_eq!(outcome, JoinOutcome::Queued { size: user as usize });
        }
        match lobby.on_join(CHAT, Id::new(5)).await {
            Ok(JoinOutcome::Started(view)) => view,
            other => panic!("expected a session, got {other:?}"),
        }
    }

    fn live_prompt(lobby: &Lobby<Recorder, Shelf>) -> PromptId {
        lobby.registry().session_for(CHAT).and_then(|view| view.prompt).unwrap()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn runs_quiz_to_completion() {
        let lobby = lobby(Vec::from([content(3)]));
        let view = start(&lobby).await;
        assert_eq!((view.current, view.total), (0, 3));
        assert_eq!(lobby.on_join(CHAT, Id::new(6)).await, Err(error::JoinError::SessionActive));
        assert_eq!(lobby.status(CHAT), Status::Running { number: 1, total: 3 });

        // The first question follows the announcement after a short pause.
        time::sleep(Duration::from_millis(1900)).await;
        assert!(lobby.registry().session_for(CHAT).unwrap().prompt.is_none());
        time::sleep(Duration::from_millis(200)).await;
        let first = live_prompt(&lobby);
        assert_eq!(lobby.on_answer(first, Id::new(1), 0), AnswerOutcome::Accepted);
        assert_eq!(lobby.on_answer(first, Id::new(1), 1), AnswerOutcome::Duplicate);
        assert_eq!(lobby.on_answer(first, Id::new(2), 1), AnswerOutcome::Accepted);

        // Each question stays open for the time limit plus the grace period.
        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(live_prompt(&lobby), first);
        time::sleep(Duration::from_secs(1)).await;
        let second = live_prompt(&lobby);
        assert_ne!(first, second);
        assert_eq!(lobby.on_answer(first, Id::new(3), 0), AnswerOutcome::Stale);
        assert_eq!(lobby.status(CHAT), Status::Running { number: 2, total: 3 });

        time::sleep(Duration::from_secs(40)).await;
        assert!(lobby.registry().session_for(CHAT).is_none());
        assert_eq!(lobby.status(CHAT), Status::Idle);
        assert_eq!(lobby.on_answer(second, Id::new(3), 0), AnswerOutcome::Stale);

        let reveal = Call::Notice(String::from("The correct answer was ||right||."));
        assert_eq!(
            lobby.transport().calls(),
            [
                Call::Notice(String::from("Quiz started! 3 questions, 15 seconds per question. Let's begin!")),
                Call::Poll(1),
                Call::Close,
                reveal.clone(),
                Call::Poll(2),
                Call::Close,
                reveal.clone(),
                Call::Poll(3),
                Call::Close,
                reveal,
                Call::Notice(String::from("Quiz completed! Total questions: 3. Use /join to start a new quiz.")),
            ]
        );

        // The room is open for a new round.
        assert_eq!(lobby.on_join(CHAT, Id::new(9)).await, Ok(JoinOutcome::Queued { size: 1 }));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn frees_room_while_final_reveal_is_posted() {
        let recorder = Recorder { notice_delay: Duration::from_secs(5), ..Default::default() };
        let lobby = Lobby::new(recorder, Shelf(Vec::from([content(1)])), Config::default());
        start(&lobby).await;

        // The only question goes out at 2s and closes at 18s. Its reveal is still in flight here.
        time::sleep(Duration::from_millis(18_500)).await;
        assert_eq!(lobby.transport().calls().last(), Some(&Call::Close));
        assert_eq!(lobby.status(CHAT), Status::Idle);
        assert!(lobby.registry().session_for(CHAT).is_none());
        assert_eq!(lobby.on_join(CHAT, Id::new(9)).await, Ok(JoinOutcome::Queued { size: 1 }));

        time::sleep(Duration::from_secs(20)).await;
        let calls = lobby.transport().calls();
        assert!(calls.contains(&Call::Notice(String::from("The correct answer was ||right||."))));
        assert_eq!(
            calls.last(),
            Some(&Call::Notice(String::from("Quiz completed! Total questions: 1. Use /join to start a new quiz.")))
        );
        assert_eq!(lobby.status(CHAT), Status::Waiting { queued: 1 });
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn abandons_quiz_when_delivery_fails() {
        let lobby = lobby(Vec::from([content(3)]));
        lobby.transport().broken.store(true, Ordering::Release);
        start(&lobby).await;

        time::sleep(Duration::from_secs(3)).await;
        assert!(lobby.registry().session_for(CHAT).is_none());
        assert_eq!(
            lobby.transport().calls().last(),
            Some(&Call::Notice(String::from("Error sending question: the chat platform is unavailable.")))
        );
        assert_eq!(lobby.on_join(CHAT, Id::new(1)).await, Ok(JoinOutcome::Queued { size: 1 }));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn announces_missing_content() {
        let lobby = lobby(Vec::new());
        for user in 1..=4 {
            lobby.on_join(CHAT, Id::new(user)).await.unwrap();
        }
        let outcome = lobby.on_join(CHAT, Id::new(5)).await.unwrap();
        assert_eq!(outcome, JoinOutcome::Aborted(error::CreationError::NoContentAvailable));
        assert_eq!(lobby.registry().queue_size_for(CHAT), 0);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(
            lobby.transport().calls(),
            [Call::Notice(String::from("No quiz available for today. Use /generate to create one."))]
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stops_timers_of_ended_sessions() {
        let lobby = lobby(Vec::from([content(3)]));
        start(&lobby).await;
        time::sleep(Duration::from_secs(3)).await;
        assert!(lobby.registry().end_session(CHAT));

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(lobby.transport().calls().len(), 2);
        assert_eq!(lobby.status(CHAT), Status::Idle);
    }
}
