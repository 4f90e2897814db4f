mod discord;
mod error;

pub use discord::Discord;

use crate::lobby::{AnswerOutcome, ChatId, JoinOutcome, Lobby, PromptId, Status, UserId};
use db::Library;
use twilight_model::{
    application::interaction::{
        application_command::CommandData, message_component::MessageComponentInteractionData, Interaction,
        InteractionData, InteractionType,
    },
    channel::message::{component::ComponentType, embed::EmbedField, Embed, MessageFlags},
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    user::User,
};

/// Name under which generated sample content is stored.
const SAMPLE_NAME: &str = "sample";

fn reply(content: String) -> InteractionResponse {
    InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData { content: Some(content), ..Default::default() }),
    }
}

fn ephemeral(content: String) -> InteractionResponse {
    InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData {
            content: Some(content),
            flags: Some(MessageFlags::EPHEMERAL),
            ..Default::default()
        }),
    }
}

pub struct Bot {
    lobby: Lobby<Discord, Library>,
}

impl Bot {
    pub fn new(lobby: Lobby<Discord, Library>) -> Self {
        Self { lobby }
    }

    pub async fn on_message(&self, interaction: Interaction) -> InteractionResponse {
        let result = match interaction.kind {
            InteractionType::Ping => Ok(InteractionResponse { kind: InteractionResponseType::Pong, data: None }),
            InteractionType::ApplicationCommand => self.on_app_command(interaction).await,
            InteractionType::MessageComponent => self.on_msg_component(interaction),
            _ => Err(error::Error::UnsupportedInteraction),
        };

        match result {
            Ok(res) => res,
            Err(err) => ephemeral(err.to_string()),
        }
    }

    async fn on_app_command(&self, interaction: Interaction) -> error::Result<InteractionResponse> {
        #[allow(deprecated)]
        let chat = interaction.channel_id;
        let user =
            interaction.member.and_then(|member| member.user).xor(interaction.user).ok_or(error::Error::UnknownUser)?;
        let data = interaction.data.ok_or(error::Error::Fatal)?;
        let InteractionData::ApplicationCommand(data) = data else {
            return Err(error::Error::Fatal);
        };

        let CommandData { name, .. } = *data;
        match name.as_str() {
            "join" => self.on_join_command(chat.ok_or(error::Error::UnknownChannel)?, user.id).await,
            "quiz" => Ok(self.on_quiz_command(chat.ok_or(error::Error::UnknownChannel)?)),
            "generate" => self.on_generate_command().await,
            "convert" => self.on_convert_command().await,
            "help" | "start" => Ok(Self::on_help_command()),
            _ => Err(error::Error::UnknownCommandName),
        }
    }

    async fn on_join_command(&self, chat: ChatId, user: UserId) -> error::Result<InteractionResponse> {
        let quorum = self.lobby.config().quorum;
        let content = match self.lobby.on_join(chat, user).await {
            Ok(JoinOutcome::Queued { size }) => format!("<@{user}> joined! Total: {size}/{quorum}"),
            // The lobby announces the start or the failure to the whole channel.
            Ok(JoinOutcome::Started(_) | JoinOutcome::Aborted(_)) => {
                format!("<@{user}> joined! Total: {quorum}/{quorum}")
            }
            Err(err) => return Ok(ephemeral(err.to_string())),
        };
        Ok(reply(content))
    }

    fn on_quiz_command(&self, chat: ChatId) -> InteractionResponse {
        let content = match self.lobby.status(chat) {
            Status::Running { number, total } => format!("Quiz in progress: Question {number}/{total}"),
            Status::Waiting { queued } => {
                format!("Waiting for players: {queued}/{} joined", self.lobby.config().quorum)
            }
            Status::Idle => String::from("No active quiz. Use /join to start one!"),
        };
        ephemeral(content)
    }

    async fn on_generate_command(&self) -> error::Result<InteractionResponse> {
        let path = self
            .lobby
            .content()
            .save_for_period(&db::today(), SAMPLE_NAME, &db::sample_records())
            .await
            .map_err(|err| {
                log::error!("cannot generate sample quiz: {err}");
                error::Error::Storage
            })?;
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or(SAMPLE_NAME);
        Ok(ephemeral(format!("Sample quiz generated: `{name}`. Use /join to play it!")))
    }

    async fn on_convert_command(&self) -> error::Result<InteractionResponse> {
        let count = self.lobby.content().convert_all().await.map_err(|err| {
            log::error!("cannot convert quiz files: {err}");
            error::Error::Storage
        })?;
        let content = match count {
            0 => String::from("All quiz files are already in the standard format."),
            1 => String::from("Converted 1 quiz file to the standard format."),
            count => format!("Converted {count} quiz files to the standard format."),
        };
        Ok(ephemeral(content))
    }

    fn on_help_command() -> InteractionResponse {
        let field = |name: &str, value: &str| EmbedField { inline: false, name: name.into(), value: value.into() };
        InteractionResponse {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(InteractionResponseData {
                flags: Some(MessageFlags::EPHEMERAL),
                embeds: Some(Vec::from([Embed {
                    author: None,
                    color: Some(0x236EA5),
                    description: Some(String::from("Group quizzes for this channel.")),
                    fields: Vec::from([
                        field("`/join`", "Join the next quiz. It starts once enough players have joined."),
                        field("`/quiz`", "Show the progress of the quiz in this channel."),
                        field("`/generate`", "Store a sample quiz for today."),
                        field("`/convert`", "Rewrite stored quiz files into the standard format."),
                        field("`/help`", "Summon this help menu!"),
                    ]),
                    footer: None,
                    image: None,
                    kind: String::from("rich"),
                    provider: None,
                    thumbnail: None,
                    timestamp: None,
                    title: Some(String::from("Quiz Commands")),
                    url: None,
                    video: None,
                }])),
                ..Default::default()
            }),
        }
    }

    /// Responds to answers picked from a question's select menu.
    fn on_msg_component(&self, interaction: Interaction) -> error::Result<InteractionResponse> {
        let User { id, .. } =
            interaction.member.and_then(|member| member.user).xor(interaction.user).ok_or(error::Error::UnknownUser)?;
        let data = interaction.data.ok_or(error::Error::Fatal)?;
        let InteractionData::MessageComponent(MessageComponentInteractionData {
            component_type: ComponentType::SelectMenu,
            custom_id,
            values,
        }) = data
        else {
            return Err(error::Error::UnsupportedInteraction);
        };

        let prompt: PromptId = custom_id.parse().map_err(|_| error::Error::InvalidParams)?;
        let choice = values.into_iter().next().ok_or(error::Error::InvalidParams)?;
        let choice = choice.parse().map_err(|_| error::Error::InvalidParams)?;

        Ok(match self.lobby.on_answer(prompt, id, choice) {
            AnswerOutcome::Accepted => ephemeral(String::from("Your answer has been recorded.")),
            // Only the first answer counts, and closed questions take none at all.
            AnswerOutcome::Duplicate | AnswerOutcome::Stale => {
                InteractionResponse { kind: InteractionResponseType::DeferredUpdateMessage, data: None }
            }
        })
    }
}
