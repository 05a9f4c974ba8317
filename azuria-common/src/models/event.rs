use serde::{Deserialize, Serialize};

use crate::models::command::CommandInteraction;
use crate::models::discord::{BotIdentity, GuildRecord};

pub const READY: &str = "ready";
pub const GUILD_CREATE: &str = "guildCreate";
pub const INTERACTION_CREATE: &str = "interactionCreate";
pub const MESSAGE_CREATE: &str = "messageCreate";

/// Gateway-independent event value handed to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    Ready {
        identity: BotIdentity,
        /// Guilds the bot was already a member of when the session started.
        guild_ids: Vec<String>,
    },
    GuildCreate(GuildRecord),
    InteractionCreate(CommandInteraction),
    MessageCreate {
        channel_id: String,
        author_id: String,
        content: String,
    },
    /// Anything else, keyed by a listener name chosen by whoever synthesizes it.
    Custom {
        name: String,
        payload: serde_json::Value,
    },
}

impl GatewayEvent {
    /// The listener key this event is dispatched under.
    pub fn name(&self) -> &str {
        match self {
            GatewayEvent::Ready { .. } => READY,
            GatewayEvent::GuildCreate(_) => GUILD_CREATE,
            GatewayEvent::InteractionCreate(_) => INTERACTION_CREATE,
            GatewayEvent::MessageCreate { .. } => MESSAGE_CREATE,
            GatewayEvent::Custom { name, .. } => name,
        }
    }
}

/// One message received on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}
