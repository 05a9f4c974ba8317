//! Listeners every bot gets before its own event files are loaded.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use tracing::{debug, error, info, warn};

use azuria_common::models::event::{GUILD_CREATE, INTERACTION_CREATE, READY};
use azuria_common::models::{CommandInteraction, GatewayEvent, GuildRecord};

use crate::client::AzuriaClient;
use crate::events::{Event, EventHandler};
use crate::Error;

/// The built-in listeners, in attachment order.
pub fn default_events() -> Vec<Event> {
    let startup_guilds = Arc::new(DashSet::new());
    vec![
        Event::new(
            READY,
            IdentityRecorder {
                startup_guilds: startup_guilds.clone(),
            },
        ),
        Event::new(GUILD_CREATE, GuildReporter { startup_guilds }),
        Event::new(INTERACTION_CREATE, CommandDispatcher),
    ]
}

/// Remembers which guilds the session started with. The gateway replays a
/// guild-create for each of them right after READY.
pub struct IdentityRecorder {
    startup_guilds: Arc<DashSet<String>>,
}

#[async_trait]
impl EventHandler for IdentityRecorder {
    async fn handle(&self, _client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error> {
        if let GatewayEvent::Ready { identity, guild_ids } = event {
            info!(
                "Session ready as {} (application {}) in {} guild(s)",
                identity.user_id,
                identity.application_id,
                guild_ids.len()
            );
            for id in guild_ids {
                self.startup_guilds.insert(id.clone());
            }
        }
        Ok(())
    }
}

/// Tells the remote catalog about guilds the bot joins.
pub struct GuildReporter {
    startup_guilds: Arc<DashSet<String>>,
}

#[async_trait]
impl EventHandler for GuildReporter {
    async fn handle(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error> {
        let GatewayEvent::GuildCreate(guild) = event else {
            return Ok(());
        };

        if self.startup_guilds.remove(&guild.id).is_some() {
            debug!("Guild {} was present at READY; not reporting", guild.id);
            return Ok(());
        }

        report_guild(client, guild).await;
        Ok(())
    }
}

async fn report_guild(client: &AzuriaClient, guild: &GuildRecord) {
    let Some(identity) = client.identity() else {
        warn!("Joined guild {} before the client was ready; not reporting", guild.id);
        return;
    };

    info!("Joined guild {} ({}), registering...", guild.name, guild.id);
    match client.remote().register_guild(&identity.user_id, guild).await {
        Ok(()) => info!("Guild {} registered.", guild.id),
        Err(e) => error!("Failed to register guild {}: {}", guild.id, e),
    }
}

/// Routes slash-command interactions to the matching command.
pub struct CommandDispatcher;

#[async_trait]
impl EventHandler for CommandDispatcher {
    async fn handle(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error> {
        let GatewayEvent::InteractionCreate(interaction) = event else {
            return Ok(());
        };
        dispatch_command(client, interaction).await;
        Ok(())
    }
}

async fn dispatch_command(client: &AzuriaClient, interaction: &CommandInteraction) {
    if !interaction.in_guild() {
        debug!("Ignoring interaction {} outside a guild", interaction.id);
        return;
    }

    let Some(command) = client.commands().get(&interaction.command_name).await else {
        debug!("No command named '{}'", interaction.command_name);
        return;
    };

    if !command.modal {
        if let Err(e) = client.gateway().defer_reply(interaction, command.ephemeral).await {
            error!("Could not defer /{}: {}", command.name(), e);
            return;
        }
    }

    if let Err(e) = command.execute(client, interaction).await {
        error!("Command /{} failed: {}", command.name(), e);
    }
}
