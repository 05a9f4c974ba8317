use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::channel::message::MessageFlags;
use twilight_model::gateway::payload::incoming::{GuildCreate, InteractionCreate};
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};
use twilight_model::id::marker::{ApplicationMarker, InteractionMarker};
use twilight_model::id::Id;

use azuria_common::models::{
    BotIdentity, CommandData, CommandInteraction, GatewayEvent, GuildRecord,
};
use azuria_common::traits::GatewayApi;

use crate::settings::Settings;
use crate::Error;

/// Converts one twilight event into the framework's event type. Events the
/// framework has no use for map to `None`.
pub fn translate(event: Event) -> Option<GatewayEvent> {
    match event {
        Event::Ready(ready) => Some(GatewayEvent::Ready {
            identity: BotIdentity::new(ready.user.id.to_string(), ready.application.id.to_string()),
            guild_ids: ready.guilds.iter().map(|g| g.id.to_string()).collect(),
        }),
        Event::GuildCreate(guild) => match *guild {
            GuildCreate::Available(guild) => Some(GatewayEvent::GuildCreate(GuildRecord {
                id: guild.id.to_string(),
                name: guild.name,
                icon: guild.icon.map(|hash| hash.to_string()),
            })),
            GuildCreate::Unavailable(guild) => {
                debug!("Guild {} is unavailable", guild.id);
                None
            }
        },
        Event::InteractionCreate(create) => {
            let InteractionCreate(interaction) = *create;
            command_interaction(&interaction).map(GatewayEvent::InteractionCreate)
        }
        Event::MessageCreate(msg) => {
            if msg.author.bot {
                return None;
            }
            Some(GatewayEvent::MessageCreate {
                channel_id: msg.channel_id.to_string(),
                author_id: msg.author.id.to_string(),
                content: msg.content.clone(),
            })
        }
        other => {
            trace!("Unhandled gateway event {:?}", other.kind());
            None
        }
    }
}

fn command_interaction(interaction: &Interaction) -> Option<CommandInteraction> {
    let Some(InteractionData::ApplicationCommand(data)) = interaction.data.as_ref() else {
        return None;
    };

    Some(CommandInteraction {
        id: interaction.id.to_string(),
        token: interaction.token.clone(),
        application_id: interaction.application_id.to_string(),
        guild_id: interaction.guild_id.map(|id| id.to_string()),
        channel_id: interaction.channel.as_ref().map(|c| c.id.to_string()),
        user_id: interaction.author_id().map(|id| id.to_string()),
        command_name: data.name.clone(),
        options: serde_json::to_value(&data.options).unwrap_or_default(),
    })
}

fn parse_id<T>(raw: &str, what: &str) -> Result<Id<T>, Error> {
    raw.parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::Platform(format!("Invalid {what} ID: {raw}")))
}

async fn shard_runner(
    mut shard: Shard,
    tx: UnboundedSender<GatewayEvent>,
    ready_tx: UnboundedSender<BotIdentity>,
) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                let Some(event) = translate(event) else {
                    continue;
                };
                if let GatewayEvent::Ready { identity, .. } = &event {
                    info!("Shard {shard_id} => READY as {}", identity.user_id);
                    let _ = ready_tx.send(identity.clone());
                }
                if tx.send(event).is_err() {
                    debug!("Shard {shard_id} => event receiver dropped");
                    break;
                }
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// [`GatewayApi`] over the Discord gateway and REST API.
pub struct DiscordGateway {
    intents: Intents,
    http_timeout: Duration,
    ready_timeout: Duration,
    http: OnceCell<Arc<HttpClient>>,
    rx: AsyncMutex<Option<UnboundedReceiver<GatewayEvent>>>,
    shard_tasks: Mutex<Vec<JoinHandle<()>>>,
    shard_senders: Mutex<Vec<MessageSender>>,
}

impl DiscordGateway {
    pub fn new(settings: &Settings) -> Self {
        Self {
            intents: Intents::GUILDS | Intents::GUILD_MESSAGES,
            http_timeout: settings.http_timeout,
            ready_timeout: settings.startup_timeout,
            http: OnceCell::new(),
            rx: AsyncMutex::new(None),
            shard_tasks: Mutex::new(Vec::new()),
            shard_senders: Mutex::new(Vec::new()),
        }
    }

    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    fn http(&self) -> Result<&Arc<HttpClient>, Error> {
        self.http.get().ok_or(Error::NotReady)
    }
}

#[async_trait]
impl GatewayApi for DiscordGateway {
    async fn login(&self, token: &str) -> Result<BotIdentity, Error> {
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(self.http_timeout)
                .build(),
        );

        let config = Config::new(token.to_string(), self.intents);
        let shards = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        let (tx, rx) = unbounded_channel::<GatewayEvent>();
        let (ready_tx, mut ready_rx) = unbounded_channel::<BotIdentity>();
        *self.rx.lock().await = Some(rx);

        for shard in shards {
            self.shard_senders.lock().push(shard.sender());
            let handle = tokio::spawn(shard_runner(shard, tx.clone(), ready_tx.clone()));
            self.shard_tasks.lock().push(handle);
        }
        drop(ready_tx);

        let identity = tokio::time::timeout(self.ready_timeout, ready_rx.recv())
            .await?
            .ok_or_else(|| Error::Platform("gateway closed before READY".into()))?;

        if self.http.set(http).is_err() {
            warn!("Discord HTTP client was already initialised; keeping the first one");
        }
        Ok(identity)
    }

    async fn next_event(&self) -> Option<GatewayEvent> {
        let mut guard = self.rx.lock().await;
        match guard.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    async fn create_command(&self, application_id: &str, data: &CommandData) -> Result<(), Error> {
        let application = parse_id::<ApplicationMarker>(application_id, "application")?;
        self.http()?
            .interaction(application)
            .create_global_command()
            .chat_input(&data.name, &data.description)
            .command_options(&data.options)
            .await
            .map_err(|e| Error::Platform(format!("Error registering /{}: {e}", data.name)))?;
        Ok(())
    }

    async fn defer_reply(&self, interaction: &CommandInteraction, ephemeral: bool) -> Result<(), Error> {
        let application = parse_id::<ApplicationMarker>(&interaction.application_id, "application")?;
        let interaction_id = parse_id::<InteractionMarker>(&interaction.id, "interaction")?;

        let response = InteractionResponse {
            kind: InteractionResponseType::DeferredChannelMessageWithSource,
            data: ephemeral.then(|| InteractionResponseData {
                flags: Some(MessageFlags::EPHEMERAL),
                ..Default::default()
            }),
        };

        self.http()?
            .interaction(application)
            .create_response(interaction_id, &interaction.token, &response)
            .await
            .map_err(|e| Error::Platform(format!("Error deferring interaction: {e}")))?;
        Ok(())
    }

    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<(), Error> {
        let application = parse_id::<ApplicationMarker>(&interaction.application_id, "application")?;
        self.http()?
            .interaction(application)
            .create_followup(&interaction.token)
            .content(content)
            .await
            .map_err(|e| Error::Platform(format!("Error sending follow-up: {e}")))?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        for sender in self.shard_senders.lock().drain(..) {
            if let Err(e) = sender.close(CloseFrame::NORMAL) {
                warn!("Failed to close shard: {e}");
            }
        }

        let tasks: Vec<JoinHandle<()>> = self.shard_tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        *self.rx.lock().await = None;
        info!("Discord gateway disconnected");
        Ok(())
    }
}
