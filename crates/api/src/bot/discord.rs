use crate::{
    lobby::{ChatId, Prompt, PromptId},
    transport::{DeliveryError, Transport},
};
use async_trait::async_trait;
use dashmap::DashMap;
use twilight_model::{
    channel::message::{
        component::{ActionRow, SelectMenu, SelectMenuOption},
        Component,
    },
    id::{marker::MessageMarker, Id},
};

/// Discord rejects select menu labels longer than this.
const MAX_LABEL: usize = 100;

fn label(text: &str) -> String {
    text.chars().take(MAX_LABEL).collect()
}

fn render(prompt: &Prompt) -> (String, [Component; 1]) {
    let content = format!(
        "**Question {}:** {}\n*You have {} seconds to answer.*",
        prompt.number,
        prompt.question,
        prompt.time_limit.as_secs()
    );

    let options = prompt
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| SelectMenuOption {
            default: false,
            description: None,
            emoji: None,
            label: label(option),
            value: index.to_string(),
        })
        .collect();

    let menu = Component::ActionRow(ActionRow {
        components: Vec::from([Component::SelectMenu(SelectMenu {
            custom_id: prompt.id.to_string(),
            disabled: false,
            max_values: Some(1),
            min_values: Some(1),
            options,
            placeholder: Some(String::from("Your Answer")),
        })]),
    });

    (content, [menu])
}

/// Posts questions as select menus in Discord channels.
pub struct Discord {
    client: twilight_http::Client,
    /// Messages of questions that still accept answers.
    polls: DashMap<PromptId, Id<MessageMarker>>,
}

impl Discord {
    pub fn new(token: String) -> Self {
        Self { client: twilight_http::Client::new(token), polls: DashMap::new() }
    }
}

#[async_trait]
impl Transport for Discord {
    async fn broadcast_poll(&self, chat: ChatId, prompt: &Prompt) -> Result<(), DeliveryError> {
        let (content, components) = render(prompt);
        let request = self
            .client
            .create_message(chat)
            .content(&content)
            .and_then(|request| request.components(&components))
            .map_err(|err| {
                log::error!("cannot post question {} in {chat}: {err}", prompt.number);
                DeliveryError::Rejected
            })?;

        let response = request.await.map_err(|err| {
            log::error!("cannot post question {} in {chat}: {err}", prompt.number);
            DeliveryError::Unavailable
        })?;

        let message = response.model().await.map_err(|err| {
            log::error!("unexpected reply to question {} in {chat}: {err}", prompt.number);
            DeliveryError::Unavailable
        })?;

        self.polls.insert(prompt.id, message.id);
        Ok(())
    }

    async fn close_poll(&self, chat: ChatId, prompt: PromptId) {
        let Some((_, message)) = self.polls.remove(&prompt) else {
            return;
        };

        let request = match self.client.update_message(chat, message).components(Some(&[])) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("cannot close question {prompt} in {chat}: {err}");
                return;
            }
        };

        if let Err(err) = request.await {
            log::warn!("cannot close question {prompt} in {chat}: {err}");
        }
    }

    async fn send_notice(&self, chat: ChatId, text: &str) {
        let request = match self.client.create_message(chat).content(text) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("cannot post notice in {chat}: {err}");
                return;
            }
        };

        if let Err(err) = request.await {
            log::warn!("cannot post notice in {chat}: {err}");
        }
    }
}
