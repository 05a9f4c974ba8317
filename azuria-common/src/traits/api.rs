use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::models::{
    BotIdentity, CommandData, CommandInteraction, GatewayEvent, GuildConfigEntry, GuildRecord,
    PushNotification,
};

/// The external real-time gateway, as seen by the framework.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Authenticate and open the session. Resolves once the bot's identity is known.
    async fn login(&self, token: &str) -> Result<BotIdentity, Error>;

    /// Next inbound event, or `None` once the session has ended.
    async fn next_event(&self) -> Option<GatewayEvent>;

    /// Submit one command definition to the application's command catalog.
    async fn create_command(&self, application_id: &str, data: &CommandData) -> Result<(), Error>;

    /// Acknowledge an interaction now and answer later.
    async fn defer_reply(&self, interaction: &CommandInteraction, ephemeral: bool) -> Result<(), Error>;

    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<(), Error>;

    async fn disconnect(&self) -> Result<(), Error>;
}

/// The bot-management HTTP service.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn register_guild(&self, bot_id: &str, guild: &GuildRecord) -> Result<(), Error>;
    async fn fetch_configs(&self, bot_id: &str) -> Result<Vec<GuildConfigEntry>, Error>;
}

/// Real-time subscription channel used for config-change notifications.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<PushNotification>, Error>;
    async fn close(&self) -> Result<(), Error>;
}
